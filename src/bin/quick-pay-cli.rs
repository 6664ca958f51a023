use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use quick_pay::promptpay::{crc, tlv, PaymentCode};
use quick_pay::render;

/// Tag of the merchant account block whose value nests further elements.
const NESTED_TAG: &str = "29";

#[derive(Parser, Debug)]
#[command(name = "quick-pay-cli", version, about = "PromptPay payload helper CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the payload string for a recipient and optional amount
    Payload {
        /// Mobile number, national ID or e-wallet reference
        #[arg(long)]
        to: String,

        /// Amount in baht (omit for a reusable static code)
        #[arg(long)]
        amount: Option<f64>,
    },

    /// Render the payment code as a QR in the terminal
    Qr {
        #[arg(long)]
        to: String,

        #[arg(long)]
        amount: Option<f64>,

        /// Write a BMP data URI instead of terminal blocks
        #[arg(long = "data-uri", default_value_t = false)]
        data_uri: bool,
    },

    /// Decode a payload into its elements and verify the checksum
    Inspect {
        payload: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Payload { to, amount } => {
            let code = PaymentCode::new(&to, amount)?;
            println!("{}", code.payload());
        }
        Commands::Qr {
            to,
            amount,
            data_uri,
        } => {
            let code = PaymentCode::new(&to, amount)?;
            let payload = code.payload();
            if data_uri {
                println!("{}", render::to_bmp_data_uri(&payload, Some(8))?);
            } else {
                println!("{}", render::to_terminal(&payload)?);
                println!("{} ({})", code.identifier(), code.account_kind());
                println!("{payload}");
            }
        }
        Commands::Inspect { payload } => inspect(payload.trim())?,
    }
    Ok(())
}

fn inspect(payload: &str) -> Result<()> {
    let fields = tlv::parse(payload).context("payload is not a valid TLV string")?;
    for field in &fields {
        println!("{field}");
        if field.tag == NESTED_TAG {
            match field.children() {
                Ok(children) => {
                    for child in children {
                        println!("  {child}");
                    }
                }
                Err(e) => println!("  (not a nested block: {e})"),
            }
        }
    }
    if !crc::verify_payload(payload) {
        bail!("checksum mismatch");
    }
    println!("checksum ok");
    Ok(())
}
