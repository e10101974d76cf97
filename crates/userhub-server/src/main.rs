use clap::Parser;
use userhub_server::{Profile, ServerBuilder, observability};

#[tokio::main]
async fn main() {
    // A .env file is optional; anything else going wrong there is worth a
    // warning before logging is even up.
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("warning: failed to load .env file: {e}");
        }
    }

    let profile = Profile::parse();
    observability::init_tracing(&profile.log_level);

    let server = match ServerBuilder::new(profile).build().await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("server initialization failed: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = server.run().await {
        eprintln!("server error: {e}");
        std::process::exit(1);
    }
}
