//! hypers: print the merged hyperparameters of an example training script
//!
//! Run with config files and overrides, e.g.
//! `hypers configs/default_params.py --tags=cat,dog,fish --layers=2,3,4,5`.

use anyhow::Result;

mod cli;

fn main() -> Result<()> {
    cli::run()
}
