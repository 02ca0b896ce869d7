use error_chain::ChainedError;
use socialnet::{db, Config};
use std::process;

fn run() -> db::Result<usize> {
    let config = Config::from_env()?;
    let pool = db::init_pool(&config)?;
    if config.run_migrations {
        db::run_migrations(&pool)?;
    }
    let mut connection = pool.get()?;
    db::seed::seed(&mut connection)
}

fn main() {
    match run() {
        Ok(inserted) => println!("Seed complete! {} user(s) added.", inserted),
        Err(e) => {
            eprintln!("{}", e.display_chain());
            process::exit(1);
        }
    }
}
