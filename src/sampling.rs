//! Keyword filtering, account aggregation, materiality and sample selection.

use crate::model::{
    AccountGroup, SamplingConfig, SamplingResults, SamplingSummary, SelectedSample, SelectionReason, Transaction,
};
use crate::normalize::{IdGenerator, backfill_ids};
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// Keeps transactions whose account name contains any keyword
/// (case-insensitive). No keywords means no filtering.
pub fn filter_by_keywords(transactions: Vec<Transaction>, keywords: &[String]) -> Vec<Transaction> {
    let keys: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_uppercase())
        .filter(|k| !k.is_empty())
        .collect();
    if keys.is_empty() {
        return transactions;
    }
    transactions
        .into_iter()
        .filter(|t| {
            let name = t.account_name.to_uppercase();
            keys.iter().any(|k| name.contains(k.as_str()))
        })
        .collect()
}

/// Groups by exact account name in first-seen order.
pub fn aggregate_accounts(transactions: Vec<Transaction>) -> Vec<AccountGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<AccountGroup> = Vec::new();
    for t in transactions {
        let slot = match index.get(&t.account_name) {
            Some(&i) => i,
            None => {
                index.insert(t.account_name.clone(), groups.len());
                groups.push(AccountGroup {
                    account_name: t.account_name.clone(),
                    account_number: t.account_number.clone(),
                    transactions: Vec::new(),
                    total_balance: 0.0,
                    transaction_count: 0,
                });
                groups.len() - 1
            }
        };
        let g = &mut groups[slot];
        g.total_balance += t.abs_amount();
        g.transaction_count += 1;
        g.transactions.push(t);
    }
    groups
}

/// Accounts strictly above tolerable misstatement.
pub fn material_accounts(groups: Vec<AccountGroup>, tolerable_misstatement: f64) -> Vec<AccountGroup> {
    groups.into_iter().filter(|g| g.total_balance > tolerable_misstatement).collect()
}

fn sample_of(t: &Transaction, reason: SelectionReason, group: &AccountGroup) -> SelectedSample {
    SelectedSample {
        transaction: t.clone(),
        selection_reason: reason,
        account_group: group.account_name.clone(),
        group_total_balance: group.total_balance,
    }
}

/// Picks at most `sample_size` transactions from one account: first every
/// item above testing scope, then the largest remaining items.
pub fn select_samples(group: &AccountGroup, config: &SamplingConfig) -> Vec<SelectedSample> {
    let cap = config.sample_cap();
    let mut sorted: Vec<&Transaction> = group.transactions.iter().collect();
    // stable: equal magnitudes keep input order
    sorted.sort_by(|a, b| b.abs_amount().total_cmp(&a.abs_amount()));

    let mut picked: Vec<SelectedSample> = Vec::with_capacity(cap.min(sorted.len()));
    // positions in `sorted`; one transaction is never picked twice even if
    // source ids repeat
    let mut chosen: HashSet<usize> = HashSet::new();

    for (pos, t) in sorted.iter().enumerate() {
        if picked.len() >= cap {
            break;
        }
        if t.abs_amount() > config.testing_scope {
            chosen.insert(pos);
            picked.push(sample_of(t, SelectionReason::OverScope, group));
        }
    }
    let over_scope = picked.len();

    for (pos, t) in sorted.iter().enumerate() {
        if picked.len() >= cap {
            break;
        }
        if chosen.insert(pos) {
            picked.push(sample_of(t, SelectionReason::HighValueKeyItem, group));
        }
    }
    debug!(
        "account '{}': {} over scope, {} key items of {} transactions",
        group.account_name,
        over_scope,
        picked.len() - over_scope,
        group.transaction_count
    );
    picked
}

pub fn summarize(samples: &[SelectedSample], material: &[AccountGroup]) -> SamplingSummary {
    let total_value_tested: f64 = samples.iter().map(|s| s.transaction.abs_amount()).sum();
    let total_material_balance: f64 = material.iter().map(|g| g.total_balance).sum();
    let coverage_percentage = if total_material_balance == 0.0 {
        0.0
    } else {
        total_value_tested / total_material_balance * 100.0
    };
    let over_scope_count = samples.iter().filter(|s| s.selection_reason == SelectionReason::OverScope).count();
    SamplingSummary {
        total_material_accounts: material.len(),
        total_value_tested,
        total_material_balance,
        coverage_percentage,
        total_transactions_reviewed: material.iter().map(|g| g.transaction_count).sum(),
        over_scope_count,
        high_value_count: samples.len() - over_scope_count,
    }
}

/// Full pipeline: ids, keyword filter, aggregation, materiality, selection,
/// summary. Deterministic for identical inputs.
pub fn run_sampling(transactions: Vec<Transaction>, config: &SamplingConfig) -> SamplingResults {
    let mut ids = IdGenerator::default();
    let transactions = backfill_ids(transactions, &mut ids);
    let total = transactions.len();

    let filtered = filter_by_keywords(transactions, &config.target_keywords);
    let filtered_transaction_count = filtered.len();
    debug!("keyword filter kept {filtered_transaction_count} of {total} transactions");

    let groups = aggregate_accounts(filtered);
    let group_count = groups.len();
    let material = material_accounts(groups, config.tolerable_misstatement);
    debug!("{} of {group_count} accounts above tolerable misstatement", material.len());

    let samples: Vec<SelectedSample> = material.iter().flat_map(|g| select_samples(g, config)).collect();
    let summary = summarize(&samples, &material);
    info!(
        "selected {} samples from {} material accounts ({:.2}% coverage)",
        samples.len(),
        summary.total_material_accounts,
        summary.coverage_percentage
    );

    SamplingResults { samples, summary, material_accounts: material, filtered_transaction_count }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tx(id: &str, account: &str, amount: f64) -> Transaction {
        Transaction {
            id: Some(id.to_string()),
            account_name: account.to_string(),
            account_number: format!("{account}-no"),
            amount,
            ..Default::default()
        }
    }

    fn cfg(tm: f64, scope: f64, size: i64, keywords: &[&str]) -> SamplingConfig {
        SamplingConfig {
            tolerable_misstatement: tm,
            testing_scope: scope,
            target_keywords: keywords.iter().map(|s| s.to_string()).collect(),
            sample_size: size,
        }
    }

    #[test]
    fn empty_keywords_match_everything() {
        let txns = vec![tx("1", "ADMIN", 1.0), tx("2", "Park", 2.0)];
        assert_eq!(filter_by_keywords(txns.clone(), &[]), txns);
        assert_eq!(filter_by_keywords(txns.clone(), &["  ".to_string()]), txns);
    }

    #[test]
    fn keywords_are_case_insensitive_and_trimmed() {
        let txns = vec![tx("1", "ADMIN", 1.0), tx("2", "City park maint", 2.0), tx("3", "PARKING", 3.0)];
        let out = filter_by_keywords(txns, &[" Park ".to_string()]);
        let ids: Vec<_> = out.iter().map(|t| t.id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn aggregation_partitions_and_sums_absolute_values() {
        let txns = vec![tx("1", "B", -10.0), tx("2", "A", 5.0), tx("3", "B", 2.5), tx("4", "b", 1.0)];
        let groups = aggregate_accounts(txns);
        let names: Vec<_> = groups.iter().map(|g| g.account_name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "b"]);
        assert_abs_diff_eq!(groups[0].total_balance, 12.5, epsilon = 1e-9);
        assert_eq!(groups[0].transaction_count, 2);
        assert_eq!(groups[0].account_number, "B-no");
        let ids: Vec<_> = groups[0].transactions.iter().map(|t| t.id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(groups.iter().map(|g| g.transaction_count).sum::<usize>(), 4);
    }

    #[test]
    fn materiality_is_strict() {
        let groups = aggregate_accounts(vec![tx("1", "Equal", 15000.0), tx("2", "Above", 15000.01)]);
        let material = material_accounts(groups, 15000.0);
        assert_eq!(material.len(), 1);
        assert_eq!(material[0].account_name, "Above");
    }

    #[test]
    fn over_scope_first_then_key_items() {
        let groups = aggregate_accounts(vec![
            tx("a", "X", 500.0),
            tx("b", "X", -20000.0),
            tx("c", "X", 900.0),
            tx("d", "X", 12000.0),
        ]);
        let g = &groups[0];
        let picked = select_samples(g, &cfg(0.0, 11000.0, 3, &[]));
        let got: Vec<_> = picked.iter().map(|s| (s.transaction.id.as_deref().unwrap(), s.selection_reason)).collect();
        assert_eq!(
            got,
            vec![
                ("b", SelectionReason::OverScope),
                ("d", SelectionReason::OverScope),
                ("c", SelectionReason::HighValueKeyItem),
            ]
        );
        assert!(picked.iter().all(|s| s.account_group == "X"));
        assert_abs_diff_eq!(picked[0].group_total_balance, 33400.0, epsilon = 1e-9);
        // sign is preserved on the selected item
        assert_eq!(picked[0].transaction.amount, -20000.0);
    }

    #[test]
    fn cap_applies_to_over_scope_items() {
        let groups = aggregate_accounts(vec![tx("a", "X", 300.0), tx("b", "X", 200.0), tx("c", "X", 100.0)]);
        let g = &groups[0];
        let picked = select_samples(g, &cfg(0.0, 50.0, 2, &[]));
        assert_eq!(picked.len(), 2);
        assert!(picked.iter().all(|s| s.selection_reason == SelectionReason::OverScope));
    }

    #[test]
    fn ties_keep_input_order() {
        let groups = aggregate_accounts(vec![tx("a", "X", 10.0), tx("b", "X", -10.0), tx("c", "X", 10.0)]);
        let g = &groups[0];
        let picked = select_samples(g, &cfg(0.0, 100.0, 2, &[]));
        let ids: Vec<_> = picked.iter().map(|s| s.transaction.id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn small_accounts_and_non_positive_caps() {
        let groups = aggregate_accounts(vec![tx("a", "X", 10.0)]);
        let g = &groups[0];
        assert_eq!(select_samples(g, &cfg(0.0, 0.0, 5, &[])).len(), 1);
        assert!(select_samples(g, &cfg(0.0, 0.0, 0, &[])).is_empty());
        assert!(select_samples(g, &cfg(0.0, 0.0, -1, &[])).is_empty());
    }

    #[test]
    fn reasons_respect_testing_scope() {
        let txns: Vec<_> = (1..=20).map(|i| tx(&i.to_string(), "X", (i * 100) as f64)).collect();
        let groups = aggregate_accounts(txns);
        let g = &groups[0];
        let c = cfg(0.0, 1000.0, 15, &[]);
        let picked = select_samples(g, &c);
        assert_eq!(picked.len(), 15);
        for s in &picked {
            match s.selection_reason {
                SelectionReason::OverScope => assert!(s.transaction.abs_amount() > c.testing_scope),
                SelectionReason::HighValueKeyItem => assert!(s.transaction.abs_amount() <= c.testing_scope),
            }
        }
        let unique: HashSet<_> = picked.iter().map(|s| s.transaction.id.clone()).collect();
        assert_eq!(unique.len(), picked.len());
    }

    #[test]
    fn summary_without_material_accounts() {
        let s = summarize(&[], &[]);
        assert_eq!(s.coverage_percentage, 0.0);
        assert_eq!(s.total_material_accounts, 0);
    }

    #[test]
    fn park_scenario() {
        let txns = vec![
            tx("1", "CITY PARK MAINT", 20000.0),
            tx("2", "CITY PARK MAINT", 12000.0),
            tx("3", "CITY PARK MAINT", 5000.0),
            tx("4", "ADMIN", 100000.0),
        ];
        let res = run_sampling(txns, &cfg(15000.0, 11000.0, 2, &["PARK"]));
        assert_eq!(res.filtered_transaction_count, 3);
        assert_eq!(res.material_accounts.len(), 1);
        assert_abs_diff_eq!(res.material_accounts[0].total_balance, 37000.0, epsilon = 1e-9);
        let got: Vec<_> = res.samples.iter().map(|s| (s.transaction.amount, s.selection_reason)).collect();
        assert_eq!(got, vec![(20000.0, SelectionReason::OverScope), (12000.0, SelectionReason::OverScope)]);

        let s = &res.summary;
        assert_eq!(s.total_material_accounts, 1);
        assert_abs_diff_eq!(s.total_value_tested, 32000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.total_material_balance, 37000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.coverage_percentage, 32000.0 / 37000.0 * 100.0, epsilon = 1e-9);
        assert_eq!(s.total_transactions_reviewed, 3);
        assert_eq!(s.over_scope_count, 2);
        assert_eq!(s.high_value_count, 0);
    }

    #[test]
    fn run_is_idempotent() {
        let txns = vec![
            tx("1", "Rent", 900.0),
            Transaction { account_name: "Rent".into(), amount: 50.0, ..Default::default() },
            tx("2", "Fuel", -40.0),
        ];
        let c = cfg(10.0, 100.0, 2, &[]);
        let a = run_sampling(txns.clone(), &c);
        let b = run_sampling(txns, &c);
        assert_eq!(a, b);
        assert_eq!(a.samples[1].transaction.id.as_deref(), Some("TXN-000001"));
    }
}
