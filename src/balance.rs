//! Net balances and the suggested transfers that clear them.
//!
//! [`compute_balances`] is the only entry point the rest of the service uses.
//! It is a pure function of the group's ledgers: it reads nothing else, keeps
//! no state and can run concurrently on independent snapshots.

use std::collections::HashMap;

use crate::exchange::{partition, simplify_debts};
use crate::money::{split_evenly, to_cents, to_money, Cents};
use crate::schemas::{Balance, Group, MemberId, Settlement};

/// Signed cents per member, in the order members were first seen.
///
/// Additions saturate at the `i64` bounds. Validated ledgers never get close;
/// an unvalidated document yields clamped nets instead of a panic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetBalances {
    order: Vec<MemberId>,
    cents: HashMap<MemberId, Cents>,
}

impl NetBalances {
    pub fn add(&mut self, id: &str, cents: Cents) {
        match self.cents.get_mut(id) {
            Some(net) => *net = net.saturating_add(cents),
            None => {
                self.order.push(id.to_owned());
                self.cents.insert(id.to_owned(), cents);
            }
        }
    }

    pub fn get(&self, id: &str) -> Cents {
        self.cents.get(id).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Cents)> + '_ {
        self.order.iter().map(|id| (id.as_str(), self.get(id)))
    }
}

/// Folds every expense and recorded settlement into per-member nets.
///
/// Every member starts at zero, inactive ones included. An expense with no
/// participants is shared by the whole member list. The payer does not have
/// to be a participant. A recorded settlement moves the payer's net up and the
/// receiver's net down by the amount paid.
///
/// That sign is pinned by the worked example "Bob owes Alice 10.00, pays her
/// 10.00, ends at 0.00". Flipping it would double Bob's debt instead.
///
/// Ids that are not members are not rejected: they get a net like anyone else.
pub fn compute_net_balances(group: &Group) -> NetBalances {
    let mut net = NetBalances::default();
    let member_ids: Vec<&str> = group.members.iter().map(|m| m.id.as_str()).collect();
    for id in &member_ids {
        net.add(id, 0);
    }

    for expense in &group.expenses {
        let participants: Vec<&str> = if expense.participants.is_empty() {
            member_ids.clone()
        } else {
            expense.participants.iter().map(String::as_str).collect()
        };
        let total = to_cents(expense.amount);
        let mut shares = split_evenly(total, participants.iter().copied());

        for id in participants {
            if let Some(share) = shares.remove(id) {
                net.add(id, share.saturating_neg());
            }
        }
        net.add(&expense.paid_by, total);
    }

    for record in &group.settlements {
        let cents = to_cents(record.amount);
        net.add(&record.from, cents);
        net.add(&record.to, cents.saturating_neg());
    }

    net
}

/// Ids referenced by expenses or settlement records that are not in the
/// member list. They carry a net balance but get no entry in the output of
/// [`compute_balances`].
pub fn ghost_members(group: &Group) -> Vec<MemberId> {
    let net = compute_net_balances(group);
    net.iter()
        .filter(|(id, _)| group.member(id).is_none())
        .map(|(id, _)| id.to_owned())
        .collect()
}

/// Computes one [`Balance`] per member, in member-list order.
///
/// Suggested transfers are attached to the paying member only. A member who
/// only receives money gets an empty `settlements` list: the field answers
/// "what should this member pay".
pub fn compute_balances(group: &Group) -> Vec<Balance> {
    if group.members.is_empty() {
        return vec![];
    }

    let net = compute_net_balances(group);
    let ghosts: Vec<&str> = net
        .iter()
        .map(|(id, _)| id)
        .filter(|id| group.member(id).is_none())
        .collect();
    if !ghosts.is_empty() {
        tracing::warn!(group = %group.id, ?ghosts, "ledger references ids outside the member list");
    }

    let (creditors, debtors) = partition(net.iter());
    let exchanges = simplify_debts(creditors, debtors);

    let mut by_payer: HashMap<&str, Vec<Settlement>> = HashMap::new();
    for exchange in &exchanges {
        by_payer
            .entry(exchange.from.as_str())
            .or_default()
            .push(exchange.clone());
    }

    group
        .members
        .iter()
        .map(|member| Balance {
            member_id: member.id.clone(),
            net_balance: to_money(net.get(&member.id)),
            settlements: by_payer.remove(member.id.as_str()).unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{Expense, Lang, Member, SettlementRecord};
    use chrono::{NaiveDate, TimeZone, Utc};
    use rstest::{fixture, rstest};

    fn member(id: &str, name: &str, is_active: bool) -> Member {
        Member {
            id: id.into(),
            name: name.into(),
            added_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            is_active,
        }
    }

    fn expense(id: &str, amount: f64, paid_by: &str, participants: &[&str]) -> Expense {
        Expense {
            id: id.into(),
            description: format!("expense {id}"),
            amount,
            paid_by: paid_by.into(),
            participants: participants.iter().map(|p| p.to_string()).collect(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        }
    }

    fn record(id: &str, from: &str, to: &str, amount: f64) -> SettlementRecord {
        SettlementRecord {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            amount,
            date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
        }
    }

    #[fixture]
    fn trio() -> Group {
        let mut group = Group::new(
            "g1".into(),
            "Trip".into(),
            Lang::En,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        );
        group.members = vec![
            member("alice", "Alice", true),
            member("bob", "Bob", true),
            member("charlie", "Charlie", true),
        ];
        group
    }

    fn nets(balances: &[Balance]) -> Vec<(&str, f64)> {
        balances
            .iter()
            .map(|b| (b.member_id.as_str(), b.net_balance))
            .collect()
    }

    #[rstest]
    fn empty_group_has_no_balances() {
        let group = Group::new("g".into(), "Empty".into(), Lang::It, Utc::now());

        assert!(compute_balances(&group).is_empty());
    }

    #[rstest]
    fn no_expenses_all_zero(trio: Group) {
        let balances = compute_balances(&trio);

        assert_eq!(
            nets(&balances),
            vec![("alice", 0.0), ("bob", 0.0), ("charlie", 0.0)]
        );
        assert!(balances.iter().all(|b| b.settlements.is_empty()));
    }

    #[rstest]
    fn empty_participants_means_every_member(mut trio: Group) {
        trio.members[2].is_active = false;
        trio.expenses.push(expense("e1", 30.0, "alice", &[]));

        let balances = compute_balances(&trio);

        assert_eq!(
            nets(&balances),
            vec![("alice", 20.0), ("bob", -10.0), ("charlie", -10.0)]
        );
    }

    #[rstest]
    fn payer_outside_participants(mut trio: Group) {
        trio.expenses.push(expense("e1", 20.0, "alice", &["bob", "charlie"]));

        let balances = compute_balances(&trio);

        assert_eq!(
            nets(&balances),
            vec![("alice", 20.0), ("bob", -10.0), ("charlie", -10.0)]
        );
    }

    #[rstest]
    fn receiver_only_member_gets_empty_list(mut trio: Group) {
        trio.expenses.push(expense("e1", 30.0, "alice", &[]));

        let balances = compute_balances(&trio);

        assert!(balances[0].settlements.is_empty());
        assert_eq!(balances[1].settlements.len(), 1);
        assert_eq!(balances[1].settlements[0].to, "alice");
    }

    #[rstest]
    fn inactive_payer_keeps_credit(mut trio: Group) {
        trio.members[0].is_active = false;
        trio.expenses.push(expense("e1", 9.0, "alice", &["bob", "charlie"]));

        let balances = compute_balances(&trio);

        assert_eq!(balances[0].net_balance, 9.0);
    }

    #[rstest]
    fn settlement_record_reduces_debt(mut trio: Group) {
        trio.expenses.push(expense("e1", 30.0, "alice", &[]));
        trio.settlements.push(record("s1", "charlie", "alice", 4.0));

        let net = compute_net_balances(&trio);

        assert_eq!(net.get("alice"), 1600);
        assert_eq!(net.get("charlie"), -600);
    }

    #[rstest]
    fn ghost_ids_are_reported_not_returned(mut trio: Group) {
        trio.expenses.push(expense("e1", 40.0, "alice", &["bob", "dave"]));

        let balances = compute_balances(&trio);

        assert_eq!(balances.len(), 3);
        assert_eq!(ghost_members(&trio), vec!["dave".to_string()]);
        assert_eq!(compute_net_balances(&trio).get("dave"), -2000);
    }

    #[rstest]
    fn oversized_legacy_amounts_clamp_instead_of_panicking(mut trio: Group) {
        trio.expenses.push(expense("e1", 5e16, "alice", &["bob"]));
        trio.expenses.push(expense("e2", 5e16, "alice", &["bob"]));

        let net = compute_net_balances(&trio);
        assert_eq!(net.get("alice"), Cents::MAX);
        assert_eq!(net.get("bob"), Cents::MIN);

        let balances = compute_balances(&trio);
        assert!(balances[0].net_balance > 0.0);
        assert!(balances[1].net_balance < 0.0);
        assert_eq!(balances[1].settlements.len(), 1);
        assert_eq!(balances[1].settlements[0].to, "alice");
    }

    #[rstest]
    fn recomputing_is_stable(mut trio: Group) {
        trio.expenses.push(expense("e1", 10.0, "bob", &[]));
        trio.expenses.push(expense("e2", 7.77, "charlie", &["alice", "bob"]));

        assert_eq!(compute_balances(&trio), compute_balances(&trio));
    }
}
