use ftos_chassis_check::cli::{self, CheckKind};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    cli::run(CheckKind::MxlChassis).await
}
