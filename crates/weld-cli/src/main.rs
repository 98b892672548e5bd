//! weld - static site pipeline with a live-reload development server.

use clap::Parser;
use miette::Result;
use weld_cli::{cli, config, error, logger, pipeline::Pipeline, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::set_colors(!args.no_color && logger::should_use_colors());

    let result = match config::load(&args) {
        Ok(site) => Pipeline::new(site).run(args.command.task()).await,
        Err(e) => Err(e),
    };

    result.map_err(error::cli_error_to_miette)
}
