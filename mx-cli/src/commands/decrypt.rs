//! Decrypt an encrypted export container.

use console::style;

use mx_core::error::MxResult;
use mx_core::MxError;
use mx_export::package;

pub async fn run(input: &str, output: &str, passphrase: Option<String>) -> MxResult<()> {
    let passphrase = match passphrase {
        Some(p) => p,
        None => dialoguer::Password::new()
            .with_prompt("Passphrase")
            .interact()
            .map_err(|e| MxError::Internal(format!("passphrase prompt failed: {e}")))?,
    };

    let output_path = std::path::Path::new(output);
    if output_path.exists() {
        return Err(MxError::InvalidDestination);
    }

    let container = std::fs::read(input)?;
    let plaintext = package::decrypt(&container, &passphrase)?;
    std::fs::write(output_path, &plaintext)?;

    println!(
        "{} decrypted {} -> {} ({} bytes)",
        style("OK").green().bold(),
        input,
        output,
        plaintext.len()
    );
    Ok(())
}
