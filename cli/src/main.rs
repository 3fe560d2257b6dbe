//! `satoshi`: a one-shot CLI wrapping `satoshi-core`'s key generation.
//!
//! Generates a secret key, prints it and the derived public key's
//! coordinates, then prints the compressed Base58Check address.

use clap::{Parser, Subcommand};

use satoshi_core::keys::{PublicKey, SecretKey};
use satoshi_core::Net;

#[derive(Parser)]
#[command(name = "satoshi")]
#[command(about = "Satoshi address and key tooling", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new secret/public key pair and print its address
    Getnewaddress {
        /// Derive a testnet address instead of a mainnet one
        #[arg(long)]
        testnet: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Getnewaddress { testnet } => getnewaddress(testnet),
    }
}

fn getnewaddress(testnet: bool) {
    let net = if testnet { Net::Test } else { Net::Main };
    let secret_key = SecretKey::generate();
    let public_key = PublicKey::from_secret_key(&secret_key);

    println!("generated secret key:");
    println!("{}", hex::encode(secret_key.to_bytes()).to_uppercase());

    println!("corresponding public key:");
    match public_key.point() {
        satoshi_core::curve::Point::Affine { x, y } => {
            println!("x: {}", hex::encode(x.to_be_bytes()).to_uppercase());
            println!("y: {}", hex::encode(y.to_be_bytes()).to_uppercase());
        }
        satoshi_core::curve::Point::Infinity => unreachable!("a freshly derived public key is never infinity"),
    }

    let label = if testnet { "testnet" } else { "compressed mainnet" };
    println!("{label} bitcoin address (b58check format):");
    println!("{}", public_key.address(net, true));
}
