use std::path::Path;

use anyhow::{bail, Context, Result};
use rand::RngCore;

use secretgate::config;

pub fn run(state_dir: &Path) -> Result<()> {
    let mut cfg = config::read(state_dir).context("Failed to read existing config")?;

    if cfg.store.salt.is_some() {
        bail!(
            "secretgate is already initialized in {}. \
             Removing the salt makes the encrypted store unreadable.",
            state_dir.display()
        );
    }

    println!("Initializing secretgate in {}...", state_dir.display());

    // Generate a fresh 32-byte salt
    let mut salt = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut salt);
    cfg.store.salt = Some(hex::encode(&salt));

    // Keeps any [mcpServers] already present.
    config::write(state_dir, &cfg).context("Failed to write config")?;

    println!("Initialized.");
    println!();
    println!("  1. Add a secret:        secretgate set GOOGLE_API_KEY");
    println!("  2. List secret names:   secretgate call secrets.list");
    println!("  3. Serve the gateway:   secretgate serve");
    println!();
    println!("The OS keychain is used when available. Otherwise set");
    println!("{} to use the encrypted file store.", cfg.store.password_env);

    Ok(())
}
