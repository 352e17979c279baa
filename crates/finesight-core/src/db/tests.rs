//! Database tests

use super::*;
use crate::models::*;
use crate::store::RecordStore;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn sample_split(id: &str) -> SplitExpense {
    SplitExpense {
        id: id.into(),
        user_id: "u1".into(),
        description: "Dinner".into(),
        total_amount: 90.0,
        payer: "me".into(),
        splits: vec![
            Split {
                participant: "me".into(),
                share: 30.0,
            },
            Split {
                participant: "Ana".into(),
                share: 45.5,
            },
            Split {
                participant: "Luis".into(),
                share: 14.5,
            },
        ],
        date: date("2024-03-02"),
    }
}

#[test]
fn test_in_memory_db() {
    let db = Database::in_memory().unwrap();
    assert!(db.list_expenses("u1").unwrap().is_empty());
    assert_eq!(db.backend_name(), "SQLite");
}

#[test]
fn test_schema_has_all_tables() {
    let db = Database::in_memory().unwrap();
    let conn = db.conn().unwrap();

    for table in [
        "expenses",
        "incomes",
        "payments",
        "budgets",
        "recurring_transactions",
        "recurring_runs",
        "split_expenses",
        "goals",
        "debts",
    ] {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1, "missing table {}", table);
    }
}

#[test]
fn test_migrations_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("finesight.db");
    let path = path.to_str().unwrap();

    let db = Database::new_unencrypted(path).unwrap();
    db.insert_income(&Income {
        id: "i1".into(),
        user_id: "u1".into(),
        source: "Salary".into(),
        amount: 3000.0,
        date: date("2024-01-31"),
        description: None,
    })
    .unwrap();
    drop(db);

    let reopened = Database::new_unencrypted(path).unwrap();
    assert_eq!(reopened.list_incomes("u1").unwrap().len(), 1);
}

#[test]
fn test_split_list_is_stored_as_json_text() {
    let db = Database::in_memory().unwrap();
    db.insert_split_expense(&sample_split("s1")).unwrap();

    let conn = db.conn().unwrap();
    let raw: String = conn
        .query_row("SELECT splits FROM split_expenses WHERE id = 's1'", [], |row| {
            row.get(0)
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed[1]["participant"], "Ana");
    assert_eq!(parsed[1]["share"], 45.5);
}

#[test]
fn test_duplicate_id_is_conflict() {
    let db = Database::in_memory().unwrap();
    db.insert_split_expense(&sample_split("s1")).unwrap();

    let mut other_owner = sample_split("s1");
    other_owner.user_id = "u2".into();
    let err = db.insert_split_expense(&other_owner).unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[test]
fn test_goal_upsert_rejects_foreign_id() {
    let db = Database::in_memory().unwrap();
    let goal = Goal {
        id: "g1".into(),
        user_id: "u1".into(),
        title: "Car".into(),
        target_amount: 5000.0,
        current_amount: 0.0,
        deadline: None,
        is_completed: false,
        color: None,
    };
    db.upsert_goal(&goal).unwrap();

    let mut same_owner = goal.clone();
    same_owner.current_amount = 750.0;
    db.upsert_goal(&same_owner).unwrap();
    assert_eq!(db.get_goal("u1", "g1").unwrap().unwrap().current_amount, 750.0);

    let mut intruder = goal.clone();
    intruder.user_id = "u2".into();
    assert!(matches!(db.upsert_goal(&intruder), Err(Error::Conflict(_))));
    assert_eq!(db.get_goal("u1", "g1").unwrap().unwrap().current_amount, 750.0);
}

#[test]
fn test_budget_update_onto_taken_key_is_conflict() {
    let db = Database::in_memory().unwrap();
    let food = Budget {
        id: "b1".into(),
        user_id: "u1".into(),
        category: "Food".into(),
        limit: 200.0,
        month: 3,
        year: 2024,
    };
    let mut rent = food.clone();
    rent.id = "b2".into();
    rent.category = "Rent".into();
    db.upsert_budget(&food).unwrap();
    db.upsert_budget(&rent).unwrap();

    rent.category = "Food".into();
    assert!(matches!(db.update_budget(&rent), Err(Error::Conflict(_))));
}

#[test]
fn test_recurring_claim_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("claims.db");
    let path = path.to_str().unwrap();

    let db = Database::new_unencrypted(path).unwrap();
    assert!(db.claim_recurring_run("r1", date("2024-02-01")).unwrap());
    drop(db);

    let db = Database::new_unencrypted(path).unwrap();
    assert!(!db.claim_recurring_run("r1", date("2024-02-01")).unwrap());
    assert!(db.claim_recurring_run("r1", date("2024-02-02")).unwrap());
}

#[test]
fn test_active_recurring_spans_owners() {
    let db = Database::in_memory().unwrap();
    for (id, owner, active) in [("r1", "u1", true), ("r2", "u2", true), ("r3", "u1", false)] {
        db.insert_recurring(&RecurringTransaction {
            id: id.into(),
            user_id: owner.into(),
            title: "Netflix".into(),
            amount: 15.49,
            category: "Entertainment".into(),
            frequency: Frequency::Monthly,
            next_date: date("2024-01-15"),
            is_active: active,
            description: None,
        })
        .unwrap();
    }

    let active = db.list_all_active_recurring().unwrap();
    let ids: Vec<_> = active.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r2"]);
}

#[test]
fn test_encrypted_database_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secret.db");
    let path = path.to_str().unwrap();

    let db = Database::new_with_key(path, Some("correct horse")).unwrap();
    RecordStore::<Debt>::insert(
        &db,
        &Debt {
            id: "d1".into(),
            user_id: "u1".into(),
            kind: DebtType::Owe,
            person: "Sam".into(),
            amount: 20.0,
            due_date: None,
            is_paid: false,
        },
    )
    .unwrap();
    drop(db);

    let db = Database::new_with_key(path, Some("correct horse")).unwrap();
    assert_eq!(db.list_debts("u1").unwrap().len(), 1);
    drop(db);

    assert!(Database::new_with_key(path, Some("wrong passphrase")).is_err());
}

#[test]
fn test_derive_key_is_stable() {
    let a = derive_key("passphrase").unwrap();
    let b = derive_key("passphrase").unwrap();
    let c = derive_key("other").unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}
