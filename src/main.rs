use clap::Parser;

use eigenframe::{input, post_processor, EigenframeError, Model};

/// Natural frequencies and mode shapes of a planar frame
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Model script (json)
    input: String,

    /// Mode to select, 1-based
    #[arg(short, long, default_value_t = 1)]
    mode: usize,

    /// Multiplier on the default mode-shape scale
    #[arg(short, long, default_value_t = 1.0)]
    scale: f64,

    /// Negate the selected mode shape
    #[arg(short, long)]
    flip: bool,

    /// Write the selected mode's curves to this csv file
    #[arg(long)]
    csv: Option<String>,
}

fn analyze(args: &Args) -> Result<(), EigenframeError> {
    if args.mode == 0 {
        return Err(EigenframeError::Input("modes are numbered from 1".to_owned()));
    }

    let mut model: Model = input::run(&args.input)?;
    model.solve()?;

    model.change_mode(args.mode - 1)?;
    if args.scale != 1.0 {
        model.change_scale(args.scale)?;
    }
    if args.flip {
        model.flip_sign()?;
    }

    let frequencies = model.frequencies_hz().unwrap_or_default();
    println!("{:>6} {:>16} {:>16}", "mode", "omega^2", "f [Hz]");
    for (i, (lambda, f)) in model
        .eigenvalues()
        .unwrap_or_default()
        .iter()
        .zip(&frequencies)
        .enumerate()
    {
        println!("{:>6} {:>16.6e} {:>16.6}", i + 1, lambda, f);
    }

    if let Some(output) = &args.csv {
        let mode = args.mode - 1;
        post_processor::csv_output(
            model.current_shape().unwrap_or_default(),
            mode,
            frequencies.get(mode).copied().unwrap_or_default(),
            output,
        )?;
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Err(err) = analyze(&args) {
        log::error!("{err}");
        std::process::exit(1)
    }
}
