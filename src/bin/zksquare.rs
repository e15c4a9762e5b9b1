use clap::{Args, CommandFactory, Parser, Subcommand};
use rand::Rng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use zksquare::artifacts::{self, artifact_paths, OriginalInputs, ProofRecord, VerificationKeyFile};
use zksquare::ceremony::{phase1, phase2, CeremonyPolicy, Phase1Srs, Phase2Setup};
use zksquare::errors::{Result, ZkSquareError};
use zksquare::{compile, compute_witness, prove, verify};

/// Prove knowledge of a square root without revealing it.
#[derive(Parser, Debug)]
#[command(name = "zksquare")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the trusted-setup ceremony and export the circuit keys
    Setup(SetupArgs),
    /// Generate a proof for a secret number
    Prove(ProveArgs),
    /// Verify a persisted proof
    Verify(VerifyArgs),
}

#[derive(Args, Debug)]
struct SetupArgs {
    /// SRS size bound, as 2^power constraints
    #[clap(long, default_value_t = 12)]
    power: u32,

    /// Entropy for the phase-1 contribution (random if omitted)
    #[clap(long)]
    phase1_entropy: Option<String>,

    /// Entropy for the phase-2 contribution (random if omitted)
    #[clap(long)]
    phase2_entropy: Option<String>,

    /// Minimum contributions each phase must receive before finalizing
    #[clap(long, default_value_t = 1)]
    min_contributions: u64,
}

#[derive(Args, Debug)]
struct ProveArgs {
    /// The secret number; its square becomes the public claim
    #[clap(allow_hyphen_values = true)]
    secret: i64,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Path to the proof record (defaults to build/proof.json)
    path: Option<std::path::PathBuf>,
}

fn main() {
    let log_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_env_filter(log_filter)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return;
    };

    let outcome = match command {
        Commands::Setup(args) => run_setup(args),
        Commands::Prove(args) => run_prove(args),
        Commands::Verify(args) => run_verify(args),
    };
    if let Err(e) = outcome {
        error!("{e}");
        std::process::exit(1);
    }
}

fn random_entropy() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Mirrors the ceremony artifact sequence: initial SRS, its contribution, the
/// prepared SRS, the initial circuit keys, their contribution, the final
/// proving key, and the exported verification key.
fn run_setup(args: SetupArgs) -> Result<()> {
    let policy = CeremonyPolicy {
        min_contributions: args.min_contributions,
    };

    info!("starting trusted setup");
    let srs = Phase1Srs::new(args.power)?;
    artifacts::write_phase1_srs(&artifact_paths::pot(args.power, 0), &srs)?;

    let entropy = args.phase1_entropy.unwrap_or_else(random_entropy);
    let (contributed, record) = srs.clone().contribute(&entropy)?;
    if !phase1::verify_contribution(&srs, &contributed, &record)? {
        return Err(ZkSquareError::MalformedInput(
            "phase-1 contribution failed verification".to_string(),
        ));
    }
    artifacts::write_phase1_srs(&artifact_paths::pot(args.power, 1), &contributed)?;

    let prepared = contributed.finalize(&policy)?;
    artifacts::write_prepared_srs(&artifact_paths::pot_final(args.power), &prepared)?;

    let shape = compile(prepared.size_bound())?;
    let setup = Phase2Setup::new(&prepared, shape)?;
    artifacts::write_phase2_setup(&artifact_paths::zkey(0), &setup)?;

    let entropy = args.phase2_entropy.unwrap_or_else(random_entropy);
    let (contributed, record) = setup.clone().contribute(&entropy)?;
    if !phase2::verify_contribution(&setup, &contributed, &record)? {
        return Err(ZkSquareError::MalformedInput(
            "phase-2 contribution failed verification".to_string(),
        ));
    }

    let keys = contributed.finalize(&policy)?;
    artifacts::write_circuit_keys(&artifact_paths::zkey_final(), &keys)?;

    let vk_file = VerificationKeyFile::from_vk(keys.verifying_key())?;
    vk_file.save(&artifact_paths::verification_key())?;

    info!("setup complete");
    Ok(())
}

fn run_prove(args: ProveArgs) -> Result<()> {
    let public_square = args.secret.checked_mul(args.secret).ok_or_else(|| {
        ZkSquareError::MalformedInput(format!("secret number {} squares out of range", args.secret))
    })?;
    info!(public_square, "generating proof for secret number");

    let keys = artifacts::read_circuit_keys(&artifact_paths::zkey_final())?;
    let witness = compute_witness(args.secret, public_square)?;
    let (proof, signals) = prove(&keys, witness, &mut rand::thread_rng())?;

    let record = ProofRecord::new(
        &proof,
        &signals,
        OriginalInputs {
            secret_number: args.secret,
            public_square,
        },
    )?;
    record.save(&artifact_paths::proof())?;
    info!(path = %artifact_paths::proof().display(), "proof saved");

    // Auto-verify what was actually persisted.
    let reloaded = ProofRecord::load(&artifact_paths::proof())?;
    if verify(keys.verifying_key(), &reloaded.signals()?, &reloaded.proof()?)? {
        info!(
            "verified: someone knows a number that squares to {}",
            reloaded.public_signals[0]
        );
    } else {
        error!("freshly generated proof failed verification");
        std::process::exit(1);
    }
    Ok(())
}

fn run_verify(args: VerifyArgs) -> Result<()> {
    let vk = VerificationKeyFile::load(&artifact_paths::verification_key())?.to_vk()?;
    let path = args.path.unwrap_or_else(artifact_paths::proof);
    let record = ProofRecord::load(&path)?;

    if verify(&vk, &record.signals()?, &record.proof()?)? {
        info!(
            "proof verification PASSED: someone knows a number that squares to {}",
            record.public_signals[0]
        );
        Ok(())
    } else {
        error!("proof verification FAILED");
        std::process::exit(1);
    }
}
