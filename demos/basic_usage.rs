//! Basic mapper usage example
//!
//! This example demonstrates:
//! - Opening a configured connection
//! - Describing a mapped type
//! - Inserting, updating and finding rows
//! - Querying with positional and named parameters
//!
//! Run with: cargo run --example basic_usage
//! Set `RUST_LOG=debug` to see every SQL command.

use chrono::{DateTime, Utc};
use rust_micro_orm::prelude::*;

#[derive(Debug, Default)]
struct User {
    id: i64,
    username: String,
    email: Option<String>,
    balance: f64,
    is_active: bool,
    joined: DateTime<Utc>,
}

impl Mapped for User {
    fn describe(t: &mut TypeDescriptor<Self>) {
        t.table("users").constructor(User::default);
        t.property("Id", |u| &u.id, |u| &mut u.id).key();
        t.property("Username", |u| &u.username, |u| &mut u.username);
        t.property("Email", |u| &u.email, |u| &mut u.email);
        t.property("Balance", |u| &u.balance, |u| &mut u.balance);
        t.property("IsActive", |u| &u.is_active, |u| &mut u.is_active)
            .column("is_active");
        t.property("Joined", |u| &u.joined, |u| &mut u.joined);
    }
}

const CONFIG: &str = r#"{
    "connectionStrings": {
        "Demo": { "providerName": "sqlite", "connectionString": ":memory:" }
    }
}"#;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Rust Micro ORM - Basic Usage Example ===\n");

    println!("1. Opening connection 'Demo'...");
    let strings = ConnectionStrings::from_json_str(CONFIG)?;
    let db = Connection::open(&strings, "Demo")?;
    println!("   ✓ Connected\n");

    println!("2. Creating table...");
    db.execute_batch(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            email TEXT,
            balance REAL,
            is_active INTEGER DEFAULT 1,
            joined INTEGER
        )",
    )?;
    println!("   ✓ Table created\n");

    println!("3. Inserting users...");
    let people = [
        ("alice", Some("alice@example.com"), 1500.50),
        ("bob", None, 2300.75),
        ("charlie", Some("charlie@example.com"), 980.25),
    ];
    for (username, email, balance) in people {
        let mut user = User {
            username: username.to_string(),
            email: email.map(str::to_string),
            balance,
            is_active: true,
            joined: Utc::now(),
            ..Default::default()
        };
        db.insert(&mut user)?;
        println!("   ✓ Inserted {} with id {}", user.username, user.id);
    }
    println!();

    println!("4. Updating bob...");
    if let Some(mut bob) = db.find_by_id::<User, _>(2i64)? {
        bob.email = Some("bob@example.com".to_string());
        bob.balance -= 300.0;
        let updated = db.update(&bob)?;
        println!("   ✓ Updated {} row(s)\n", updated);
    }

    println!("5. Querying rich users...");
    let rich: Vec<User> = db.query(
        "SELECT * FROM users WHERE balance > @0 ORDER BY balance DESC",
        params![1000.0],
    )?;
    for user in &rich {
        println!(
            "   - {} <{}> balance {:.2}, joined {}",
            user.username,
            user.email.as_deref().unwrap_or("no email"),
            user.balance,
            user.joined.format("%Y-%m-%d")
        );
    }
    println!();

    println!("6. Named parameters...");
    let names: Vec<String> = db.query(
        "SELECT username FROM users WHERE email LIKE @Pattern",
        named_params! { "Pattern" => "%@example.com" },
    )?;
    println!("   ✓ Users with example.com email: {:?}\n", names);

    println!("7. Scalars...");
    let total: f64 = db.scalar("SELECT SUM(balance) FROM users", ())?;
    let count: i64 = db.scalar("SELECT COUNT(*) FROM users", ())?;
    println!("   ✓ {} users, total balance {:.2}\n", count, total);

    println!("8. Transaction rollback...");
    let mut db = db;
    {
        let tx = db.transaction()?;
        tx.execute("DELETE FROM users", ())?;
        tx.rollback()?;
    }
    let remaining: Vec<User> = db.find_all()?;
    println!("   ✓ {} users remain after rollback\n", remaining.len());

    println!("=== Example completed successfully ===");
    Ok(())
}
