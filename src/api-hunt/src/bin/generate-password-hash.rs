//! Seeds an account without going through POST /api/auth/register, e.g. the
//! service user the cron scheduler logs in as.

use bcrypt::{DEFAULT_COST, hash};
use std::env;
use std::process;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <username> <email> <password>", program);
    eprintln!();
    eprintln!("Prints the bcrypt hash of <password> and an INSERT statement for the users table.");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  cargo run --bin generate-password-hash -- cron cron@localhost 's3cret!' | psql $DATABASE_URL");
    process::exit(1);
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let [_, username, email, password] = args.as_slice() else {
        usage(&args[0]);
    };

    let hashed = match hash(password, DEFAULT_COST) {
        Ok(hashed) => hashed,
        Err(e) => {
            eprintln!("Error generating hash: {}", e);
            process::exit(1);
        }
    };

    eprintln!("bcrypt hash: {}", hashed);
    println!(
        "INSERT INTO users (username, email, hashed_password) VALUES ('{}', '{}', '{}');",
        username.replace('\'', "''"),
        email.replace('\'', "''"),
        hashed
    );
    eprintln!("Use the same username and password as CRON_USERNAME / CRON_PASSWORD for the scheduler.");
}
