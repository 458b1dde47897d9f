use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::balance::compute_balances;

pub type MemberId = String;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    It,
    En,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub added_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub paid_by: MemberId,
    /// Empty means "every current member".
    #[serde(default)]
    pub participants: Vec<MemberId>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A payment that really happened between two members.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    pub id: String,
    pub from: MemberId,
    pub to: MemberId,
    pub amount: f64,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A transfer suggested by the calculator. Never persisted on its own.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Settlement {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub member_id: MemberId,
    /// Positive: the member is owed money. Negative: the member owes money.
    pub net_balance: f64,
    /// Transfers this member should make. Incoming transfers only show up on
    /// the payer's entry.
    pub settlements: Vec<Settlement>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub settlements: Vec<SettlementRecord>,
    /// Derived snapshot, rebuilt by [`Group::refresh_balances`].
    #[serde(default)]
    pub balances: Vec<Balance>,
    pub version: i64,
    #[serde(default)]
    pub lang: Lang,
}

impl Group {
    pub fn new(id: String, name: String, lang: Lang, now: DateTime<Utc>) -> Self {
        Group {
            id,
            name,
            created_at: now,
            updated_at: now,
            members: vec![],
            expenses: vec![],
            settlements: vec![],
            balances: vec![],
            version: 1,
            lang,
        }
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }

    pub fn active_members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|member| member.is_active)
    }

    /// Throws away the stored snapshot and recomputes it from the ledgers.
    pub fn refresh_balances(&mut self) {
        self.balances = compute_balances(self);
    }

    /// Marks a successful mutation.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn group_json_uses_camel_case() {
        let mut group = Group::new("g1".into(), "Trip".into(), Lang::En, now());
        group.members.push(Member {
            id: "m1".into(),
            name: "Alice".into(),
            added_at: now(),
            is_active: true,
        });

        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(value["lang"], json!("en"));
        assert_eq!(value["version"], json!(1));
        assert_eq!(value["members"][0]["isActive"], json!(true));
        assert!(value["members"][0]["addedAt"].is_string());
        assert!(value.get("updatedAt").is_some());
    }

    #[test]
    fn missing_ledgers_and_lang_default() {
        let group: Group = serde_json::from_value(json!({
            "id": "g1",
            "name": "Trip",
            "createdAt": "2024-05-01T12:00:00Z",
            "updatedAt": "2024-05-01T12:00:00Z",
            "version": 3
        }))
        .unwrap();

        assert_eq!(group.lang, Lang::It);
        assert!(group.members.is_empty());
        assert!(group.settlements.is_empty());
        assert!(group.balances.is_empty());
    }

    #[test]
    fn expense_reads_paid_by_and_date() {
        let expense: Expense = serde_json::from_value(json!({
            "id": "e1",
            "description": "Dinner",
            "amount": 30.0,
            "paidBy": "m1",
            "participants": ["m1", "m2"],
            "date": "2024-05-01",
            "createdAt": "2024-05-01T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(expense.paid_by, "m1");
        assert_eq!(expense.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn touch_bumps_version_and_timestamp() {
        let mut group = Group::new("g1".into(), "Trip".into(), Lang::It, now());
        let later = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();

        group.touch(later);

        assert_eq!(group.version, 2);
        assert_eq!(group.updated_at, later);
        assert_eq!(group.created_at, now());
    }

    #[test]
    fn active_members_skips_soft_removed() {
        let mut group = Group::new("g1".into(), "Trip".into(), Lang::It, now());
        for (id, active) in [("m1", true), ("m2", false), ("m3", true)] {
            group.members.push(Member {
                id: id.into(),
                name: id.to_uppercase(),
                added_at: now(),
                is_active: active,
            });
        }

        let ids: Vec<&str> = group.active_members().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3"]);
        assert!(group.member("m2").is_some());
    }
}
