//! dnsseal - seal a message to an SSH host key verified through DNSSEC.

use anyhow::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dnsseal_cli::run().await
}
