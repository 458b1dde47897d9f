use crate::money::{is_nearly_zero, to_money, Cents};
use crate::schemas::{MemberId, Settlement};

#[derive(Clone, Debug)]
pub struct PersonalBalance {
    pub id: MemberId,
    /// Always stored as a positive magnitude.
    pub cents: Cents,
}

/// Splits signed nets into creditors (owed money) and debtors (owing money).
/// Settled members are dropped; input order is kept.
pub fn partition<'a, I>(nets: I) -> (Vec<PersonalBalance>, Vec<PersonalBalance>)
where
    I: IntoIterator<Item = (&'a str, Cents)>,
{
    let mut creditors = Vec::new();
    let mut debtors = Vec::new();

    for (id, cents) in nets {
        if is_nearly_zero(cents) {
            continue;
        }
        let person = PersonalBalance {
            id: id.to_owned(),
            cents: cents.saturating_abs(),
        };
        if cents > 0 {
            creditors.push(person);
        } else {
            debtors.push(person);
        }
    }

    (creditors, debtors)
}

/// Greedily pairs the largest debtor with the largest creditor until one side
/// runs out.
///
/// This is a heuristic: it keeps the transfer count low for typical groups but
/// is not guaranteed minimal. Equal amounts keep their input order (the sort is
/// stable), which makes the output reproducible.
pub fn simplify_debts(
    mut creditors: Vec<PersonalBalance>,
    mut debtors: Vec<PersonalBalance>,
) -> Vec<Settlement> {
    creditors.sort_by(|a, b| b.cents.cmp(&a.cents));
    debtors.sort_by(|a, b| b.cents.cmp(&a.cents));

    let mut exchanges = Vec::new();
    let (mut ci, mut di) = (0, 0);

    while ci < creditors.len() && di < debtors.len() {
        let creditor = &mut creditors[ci];
        let debtor = &mut debtors[di];
        let pay = creditor.cents.min(debtor.cents);

        exchanges.push(Settlement {
            from: debtor.id.clone(),
            to: creditor.id.clone(),
            amount: to_money(pay),
        });

        creditor.cents -= pay;
        debtor.cents -= pay;
        if is_nearly_zero(creditor.cents) {
            ci += 1;
        }
        if is_nearly_zero(debtor.cents) {
            di += 1;
        }
    }

    exchanges
}
