use crate::config::Config;
use crate::core::{Blockchain, Transaction};
use crate::mining::pow;
use crate::storage::Database;
use crate::{LedgerError, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "ledger")]
#[command(about = "Single-node proof-of-work ledger with UTXO transactions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Data directory")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Proof-of-work difficulty in leading zero bits")]
    pub difficulty: Option<u32>,

    #[arg(long, global = true, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable debug logging")]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new ledger whose genesis reward goes to an address
    Init {
        #[arg(long, help = "Address receiving the genesis reward")]
        address: String,
        #[arg(long, help = "Genesis coinbase message")]
        memo: Option<String>,
    },

    /// Show the unspent balance of an address
    Balance {
        #[arg(long)]
        address: String,
    },

    /// Send value between addresses and mine it into a new block
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
    },

    /// Print every block from the tip back to genesis
    PrintChain,

    /// Re-check proof of work and links for the whole chain
    Validate,

    /// Show tip hash, height and difficulty
    Info,
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).try_init();

    run(cli)
}

/// Executes a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Init { address, memo } => {
            std::fs::create_dir_all(&config.storage.data_dir)?;
            let db = Arc::new(Database::new(config.db_path())?);
            let memo = memo.unwrap_or_else(|| config.genesis.message.clone());

            let chain = Blockchain::init(db, &address, &memo, config.mining.difficulty)?;
            println!("⛓️  Ledger created");
            println!("Genesis hash: {}", hex::encode(chain.last_hash()));
        }

        Commands::Balance { address } => {
            let chain = open_chain(&config)?;
            let balance = chain.utxo_set().get_balance(&address)?;
            println!("Balance of '{}': {}", address, balance);
        }

        Commands::Send { from, to, amount } => {
            let mut chain = open_chain(&config)?;
            let tx = Transaction::new_transaction(&from, &to, amount, &chain.utxo_set())?;
            let block = chain.add_block(vec![tx])?;
            println!("✅ Sent {} from {} to {}", amount, from, to);
            println!("Block hash: {}", block.hash_hex());
        }

        Commands::PrintChain => {
            let chain = open_chain(&config)?;
            for block in chain.iter() {
                let block = block?;
                println!("📦 Block {}", block.hash_hex());
                println!("Previous hash: {}", hex::encode(&block.prev_hash));
                println!("Nonce: {}", block.nonce);
                println!("PoW: {}", pow::validate(&block, chain.difficulty())?);
                for tx in &block.transactions {
                    println!("  Transaction {}", tx.id_hex());
                    for (index, input) in tx.inputs.iter().enumerate() {
                        println!(
                            "    Input {}: {}:{} sig={}",
                            index,
                            hex::encode(&input.id),
                            input.out,
                            input.sig
                        );
                    }
                    for (index, output) in tx.outputs.iter().enumerate() {
                        println!("    Output {}: {} -> {}", index, output.value, output.pub_key);
                    }
                }
                println!();
            }
        }

        Commands::Validate => {
            let chain = open_chain(&config)?;
            let report = chain.validate_chain()?;
            match report.invalid_block {
                None => println!("✅ Chain valid ({} blocks)", report.blocks),
                Some(hash) => {
                    return Err(LedgerError::InvalidChain(format!(
                        "block {} failed validation",
                        hex::encode(hash)
                    )));
                }
            }
        }

        Commands::Info => {
            let chain = open_chain(&config)?;
            println!("⛓️  Ledger Information:");
            println!("Tip hash: {}", hex::encode(chain.last_hash()));
            println!("Height: {}", chain.height()?);
            println!("Difficulty: {}", chain.difficulty());
        }
    }

    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&path)?;

    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    if let Some(difficulty) = cli.difficulty {
        config.mining.difficulty = difficulty;
    }

    config.validate()?;
    Ok(config)
}

fn open_chain(config: &Config) -> Result<Blockchain> {
    let db_path = config.db_path();
    if !Database::exists(&db_path) {
        return Err(LedgerError::NotFound(format!(
            "no ledger at {}; run `init` first",
            db_path.display()
        )));
    }

    let db = Arc::new(Database::new(db_path)?);
    Blockchain::open(db, config.mining.difficulty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn cli(temp_dir: &TempDir, args: &[&str]) -> Cli {
        let data_dir = temp_dir.path().join("data");
        let config = temp_dir.path().join("config.json");
        let mut argv = vec![
            "ledger".to_string(),
            "--data-dir".to_string(),
            data_dir.display().to_string(),
            "--config".to_string(),
            config.display().to_string(),
            "--difficulty".to_string(),
            "8".to_string(),
        ];
        argv.extend(args.iter().map(|arg| arg.to_string()));
        Cli::try_parse_from(argv).unwrap()
    }

    // sled's background flusher can hold the directory lock for a moment
    // after the previous handle is dropped
    fn retry_locked<T>(mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempts = 0;
        loop {
            match op() {
                Err(LedgerError::Storage(msg)) if msg.contains("lock") && attempts < 100 => {
                    attempts += 1;
                    std::thread::sleep(Duration::from_millis(20));
                }
                other => return other,
            }
        }
    }

    fn exec(temp_dir: &TempDir, args: &[&str]) -> Result<()> {
        retry_locked(|| run(cli(temp_dir, args)))
    }

    fn open(temp_dir: &TempDir) -> Result<Blockchain> {
        let config = resolve_config(&cli(temp_dir, &["info"]))?;
        retry_locked(|| open_chain(&config))
    }

    #[test]
    fn test_parse_send() {
        let parsed = Cli::try_parse_from(["ledger", "send", "--from", "Alice", "--to", "Bob", "--amount", "40"]).unwrap();
        match parsed.command {
            Commands::Send { from, to, amount } => {
                assert_eq!(from, "Alice");
                assert_eq!(to, "Bob");
                assert_eq!(amount, 40);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_negative_amount() {
        assert!(Cli::try_parse_from(["ledger", "send", "--from", "A", "--to", "B", "--amount", "-5"]).is_err());
    }

    #[test]
    fn test_commands_before_init_fail() {
        let temp_dir = TempDir::new().unwrap();
        let err = run(cli(&temp_dir, &["balance", "--address", "Alice"])).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn test_init_send_flow() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();

        exec(&temp_dir, &["init", "--address", "Alice"])?;
        let err = exec(&temp_dir, &["init", "--address", "Alice"]).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyExists));

        exec(&temp_dir, &["send", "--from", "Alice", "--to", "Bob", "--amount", "40"])?;
        exec(&temp_dir, &["print-chain"])?;
        exec(&temp_dir, &["validate"])?;
        exec(&temp_dir, &["info"])?;

        let err = exec(&temp_dir, &["send", "--from", "Bob", "--to", "Alice", "--amount", "41"]).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { required: 41, available: 40 }));

        let chain = open(&temp_dir)?;
        assert_eq!(chain.height()?, 1);
        assert_eq!(chain.utxo_set().get_balance("Alice")?, 60);
        assert_eq!(chain.utxo_set().get_balance("Bob")?, 40);
        Ok(())
    }

    #[test]
    fn test_validate_reports_invalid_chain() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        exec(&temp_dir, &["init", "--address", "Alice"])?;

        // blocks were mined at difficulty 8
        let err = retry_locked(|| {
            let mut parsed = cli(&temp_dir, &["validate"]);
            parsed.difficulty = Some(64);
            run(parsed)
        })
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidChain(_)));
        Ok(())
    }

    #[test]
    fn test_invalid_difficulty_flag() {
        let temp_dir = TempDir::new().unwrap();
        let mut parsed = cli(&temp_dir, &["info"]);
        parsed.difficulty = Some(0);
        assert!(matches!(resolve_config(&parsed), Err(LedgerError::InvalidInput(_))));
    }
}
