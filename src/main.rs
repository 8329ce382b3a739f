use anyhow::Result;
use boston::cli::Args;
use boston::{Backend, HParams, logging, task};
use clap::Parser;

fn main() -> Result<()> {
    let args = Args::parse();
    logging::setup_logging();

    let hparams = HParams::try_from(args)?;
    let device = <Backend as burn::tensor::backend::Backend>::Device::default();
    let result = task::train_and_evaluate::<Backend>(&hparams, &device)?;

    log::info!(
        "Finished at step {}: loss = {:.4}, mean_absolute_error = {:.4}",
        result.global_step,
        result.loss,
        result.mae
    );
    Ok(())
}
