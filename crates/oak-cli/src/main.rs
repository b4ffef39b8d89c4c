//! Generator CLI for OpenAPI action plugins.

use clap::{Parser, Subcommand};
use oak_gen::ParameterPicker;
use std::io::{BufRead, Write};

#[derive(Parser)]
#[command(name = "oak", about = "OpenAPI action plugin generator", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate plugin artifacts from an OpenAPI document
    Generate {
        #[command(subcommand)]
        what: GenerateCommand,
    },
    /// Rewrite dotted parameter names in a mask file to `__`
    FixMask {
        /// Mask file to rewrite in place
        #[arg(long)]
        path: String,
    },
}

#[derive(Subcommand)]
enum GenerateCommand {
    /// Emit README.md from the projected action list
    Readme {
        /// OpenAPI document (file path or URL)
        #[arg(long)]
        file: String,
        /// Plugin name used in the README header
        #[arg(long)]
        name: String,
        /// Mask file narrowing the listed actions
        #[arg(long, default_value = "")]
        mask: String,
        /// Directory of *.action.yaml files to include
        #[arg(long = "custom-actions", default_value = "")]
        custom_actions: String,
    },
    /// Emit a starter mask file covering every action
    Mask {
        /// OpenAPI document (file path or URL)
        #[arg(long)]
        file: String,
        /// Existing mask file to filter through
        #[arg(long, default_value = "")]
        mask: String,
        /// Output mask file
        #[arg(long, default_value = "mask.yaml")]
        output: String,
        /// Parameter names to leave out
        #[arg(long = "blacklist-params", value_delimiter = ',')]
        blacklist_params: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(long = "no-warnings")]
        no_warnings: bool,
        /// Keep only parameters present in the given mask
        #[arg(long = "filterParameters")]
        filter_parameters: bool,
    },
    /// Append one action's mask entry to a mask file
    Action {
        /// Operation id of the action to add
        #[arg(long)]
        name: String,
        /// OpenAPI document (file path or URL)
        #[arg(long)]
        file: String,
        /// Mask file to append to
        #[arg(long, default_value = "mask.yaml")]
        output: String,
        /// Parameter names to leave out
        #[arg(long = "blacklist-params", value_delimiter = ',')]
        blacklist_params: Vec<String>,
        /// Pick the exposed parameters on the terminal
        #[arg(long)]
        interactive: bool,
    },
}

/// Line-based picker: shows the options and reads a comma-separated
/// selection from stdin.
struct StdinPicker;

impl ParameterPicker for StdinPicker {
    fn pick(&self, prompt: &str, options: &[String]) -> Vec<String> {
        println!("{prompt}:");
        for (i, option) in options.iter().enumerate() {
            println!("  [{i}] {option}");
        }
        print!("numbers (comma-separated, empty for all): ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return options.to_vec();
        }

        let line = line.trim();
        if line.is_empty() {
            return options.to_vec();
        }

        line.split(',')
            .filter_map(|token| token.trim().parse::<usize>().ok())
            .filter_map(|i| options.get(i).cloned())
            .collect()
    }
}

fn confirm(summary: &str) -> bool {
    println!("{summary}");
    print!("Are you sure? [y/N] ");
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Generate { what } => match what {
            GenerateCommand::Readme {
                file,
                name,
                mask,
                custom_actions,
            } => {
                oak_gen::generate_readme(&name, &mask, &file, &custom_actions).await?;
                println!("Generated README.md");
            }
            GenerateCommand::Mask {
                file,
                mask,
                output,
                blacklist_params,
                no_warnings,
                filter_parameters,
            } => {
                let confirm_fn: Option<&oak_gen::ConfirmFn> =
                    if no_warnings { None } else { Some(&confirm) };
                oak_gen::generate_mask_file(
                    &file,
                    &mask,
                    &blacklist_params,
                    &output,
                    filter_parameters,
                    confirm_fn,
                )
                .await?;
                println!("Generated mask file into [{output}]");
            }
            GenerateCommand::Action {
                name,
                file,
                output,
                blacklist_params,
                interactive,
            } => {
                let picker = StdinPicker;
                let picker_ref: Option<&dyn ParameterPicker> =
                    if interactive { Some(&picker) } else { None };
                oak_gen::generate_action(&name, &file, &output, &blacklist_params, picker_ref)
                    .await?;
                println!("Generated [{name}] into [{output}]");
            }
        },
        Command::FixMask { path } => {
            oak_gen::fix_mask(&path)?;
            println!("Rewrote [{path}]");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("oak: {err}");
        std::process::exit(1);
    }
}
