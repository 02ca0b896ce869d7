use error_chain::ChainedError;
use socialnet::Config;
use std::process;

#[rocket::main]
async fn main() {
    let rocket = match Config::from_env().and_then(|config| socialnet::rocket(&config)) {
        Ok(rocket) => rocket,
        Err(e) => {
            eprintln!("{}", e.display_chain());
            process::exit(1);
        }
    };

    if let Err(e) = rocket.launch().await {
        eprintln!("server failed: {}", e);
        process::exit(1);
    }
}
