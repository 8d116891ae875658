//! SRTP Keygen - print fresh master key material
//!
//! Output is base64 of master key || master salt, ready for the `local_key`,
//! `remote_key` or `[[channels]] key` fields of a configuration file.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Parser;
use ring::rand::{SecureRandom, SystemRandom};
use srtp::CryptoSuite;

#[derive(Parser, Debug)]
#[command(name = "srtp-keygen")]
#[command(about = "Generate SRTP master key material", long_about = None)]
struct Args {
    /// Crypto suite (SDES name)
    #[arg(short, long, default_value = "AES_CM_128_HMAC_SHA1_80")]
    suite: String,

    /// Number of keys to generate
    #[arg(short, long, default_value = "1")]
    count: usize,

    /// Print as an SDES inline parameter (inline:<key>)
    #[arg(long)]
    inline: bool,

    /// List supported suites and exit
    #[arg(long)]
    list: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();

    if args.list {
        for suite in CryptoSuite::ALL {
            println!(
                "{:<24} profile {:#06x}, key {} + salt {} bytes",
                suite.name(),
                suite.profile_id(),
                suite.master_key_len(),
                suite.master_salt_len()
            );
        }
        return Ok(());
    }

    let suite: CryptoSuite = args.suite.parse()?;
    let rng = SystemRandom::new();

    for _ in 0..args.count {
        let mut key = vec![0u8; suite.key_material_len()];
        rng.fill(&mut key)
            .map_err(|_| anyhow::anyhow!("System random generator failed"))?;
        let encoded = STANDARD.encode(&key);
        if args.inline {
            println!("{} inline:{}", suite, encoded);
        } else {
            println!("{}", encoded);
        }
    }
    tracing::debug!("Generated {} {} key(s)", args.count, suite);
    Ok(())
}
