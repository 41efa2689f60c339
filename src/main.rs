use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use wp2mdx::{audit, config, migrate, output};

fn version_string() -> &'static str {
    let hash = env!("GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup, called exactly once
        Box::leak(format!("{}@{hash}", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "wp2mdx")]
#[command(about = "Migrate a WordPress export into MDX content")]
#[command(long_about = "\
Migrate a WordPress export into MDX content

Reads a WordPress XML export and a flat directory of media downloaded from
the old site, and writes one MDX document per published page and post.

Output structure:

  content/
  ├── pages/<slug>.mdx          # Published pages with frontmatter
  ├── posts/<slug>.mdx          # Published posts with frontmatter
  ├── data/attachments.json     # Every attachment and its local match
  ├── data/menu.json            # Navigation tree
  ├── MIGRATION_REPORT.md       # Slugs, external links, missing images
  └── IMAGE_AUDIT_REPORT.md     # Written by 'wp2mdx audit'

Image references pointing at /wp-content/uploads/ are rewritten to /images/
when a local file matches, exactly or by stripping WordPress size suffixes
(photo-300x200.jpg → photo.jpg). Unmatched references are left as they were
and listed in the migration report.

Run 'wp2mdx gen-config' to generate a documented wp2mdx.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (stock defaults when absent)
    #[arg(long, default_value = "wp2mdx.toml", global = true)]
    config: PathBuf,

    /// WordPress export file (overrides config)
    #[arg(long, global = true)]
    export: Option<PathBuf>,

    /// Local media directory (overrides config)
    #[arg(long, global = true)]
    images: Option<PathBuf>,

    /// Output content directory (overrides config)
    #[arg(long, global = true)]
    content: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert the export into MDX documents, data files and a report
    Migrate,
    /// Verify generated documents against the export and local images
    Audit,
    /// Read the export and images and show what a migration would produce
    Check,
    /// Print a stock wp2mdx.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = load_config(&cli)?;

    match cli.command {
        Command::Migrate => {
            println!("==> Migrating {}", config.export_path().display());
            let migration = migrate::migrate(&config)?;
            output::print_migrate_output(&migration);
            if let Some(publish_dir) = config.publish_dir() {
                println!("==> Published images → {}", publish_dir.display());
            }
            println!("==> Migration complete: {}", config.content_dir().display());
            println!("{}", serde_json::to_string_pretty(&migration.summary)?);
        }
        Command::Audit => {
            println!("==> Auditing images in {}", config.content_dir().display());
            let result = audit::run_audit(&config)?;
            output::print_audit_output(&result);
            if !result.passed() {
                eprintln!("{}", output::format_audit_failure(&result));
            }
            result.gate()?;
            println!("==> Audit passed");
        }
        Command::Check => {
            println!("==> Checking {}", config.export_path().display());
            let migration = migrate::plan(&config)?;
            output::print_check_output(&migration);
            println!("==> Inputs are valid");
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Load the config file and apply command-line path overrides.
fn load_config(cli: &Cli) -> Result<config::MigrateConfig, config::ConfigError> {
    let mut config = config::load_config(&cli.config)?;
    let overrides = [
        (&cli.export, &mut config.export_path),
        (&cli.images, &mut config.images_dir),
        (&cli.content, &mut config.content_dir),
    ];
    for (flag, field) in overrides {
        if let Some(path) = flag {
            *field = path_string(path);
        }
    }
    config.validate()?;
    Ok(config)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
