use clap::{ArgAction, Args, Parser, Subcommand};
use idphoto::auth::{AuthProvider, LocalAuthProvider, UserProfile};
use idphoto::export::ExportRenderer;
use idphoto::generation::GeminiClient;
use idphoto::imaging::{ImageBackend, RustBackend};
use idphoto::intake::{self, FileHandle};
use idphoto::locale::{LANG_KEY, Locale, stored_locale};
use idphoto::session::Session;
use idphoto::store::{API_KEY, LocalStore, SharedStore, default_store_path};
use idphoto::types::{ColorChoice, PrintSize};
use idphoto::{config, credentials, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "idphoto")]
#[command(about = "Turn a portrait into a red or blue background ID photo")]
#[command(long_about = "\
Turn a portrait into a red or blue background ID photo

The photo is sent to Google's Gemini image model with an instruction to
replace the background with a uniform color. The returned image is then
scaled to standard print sizes and saved as JPEG.

Typical session:

  idphoto login --name \"Li Wei\" --email li@example.com
  idphoto key set AIza...              # optional if a default key is built in
  idphoto generate me.jpg --color blue --out photos/

Print sizes:
  1-inch   295×413px
  2-inch   413×626px

Settings (API key, language, signed-in profile) persist in the user config
directory. Run 'idphoto gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: <user config dir>/idphoto/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Settings store (default: <user config dir>/idphoto/store.json)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a photo without sending it anywhere
    Check {
        file: PathBuf,
    },
    /// Replace the background and export print sizes
    Generate(GenerateArgs),
    /// Manage the stored Gemini API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// Show or set the instruction language (zh-cn, en, fr, ja)
    Lang {
        code: Option<Locale>,
    },
    /// Sign in with a local profile
    Login(LoginArgs),
    /// Sign out and forget the profile
    Logout,
    /// Show the signed-in profile
    Whoami,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(Args)]
struct GenerateArgs {
    /// Portrait to process (JPEG, PNG, WebP, TIFF)
    file: PathBuf,

    /// Background color: red or blue
    #[arg(long, short)]
    color: ColorChoice,

    /// Print size to export: 1 or 2 (inch); repeat for several
    #[arg(long = "size", short, value_name = "SIZE", default_values = ["1", "2"])]
    sizes: Vec<PrintSize>,

    /// Directory for the exported JPEGs
    #[arg(long, short, default_value = ".")]
    out: PathBuf,

    /// Use this API key instead of the stored one
    #[arg(long)]
    api_key: Option<String>,
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store an API key
    Set { key: String },
    /// Remove the stored API key
    Clear,
    /// Show which key would be used (masked)
    Show,
}

#[derive(Args)]
struct LoginArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    email: String,

    /// Stable user id (default: derived from the email)
    #[arg(long)]
    id: Option<String>,

    #[arg(long)]
    avatar_url: Option<String>,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli
        .config
        .clone()
        .or_else(config::default_config_path)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    match cli.command {
        Command::Check { file } => {
            let handle = FileHandle::from_path(&file)?;
            let image = intake::validate(&handle).await?;
            print_lines(output::format_upload(&file, &image));
            let dims = RustBackend::new().identify(image.bytes())?;
            println!("{}", output::format_dimensions(dims));
            println!("==> Photo is valid");
        }
        Command::Generate(args) => {
            let config = config::load_config(&config_path)?;
            let store = open_store(cli.store.as_deref())?;
            let locale = stored_locale(&store.borrow());
            let client = GeminiClient::new(&config.service, locale)?;
            let model = client.model().to_string();
            let auth = LocalAuthProvider::new(store.clone());
            let mut session = Session::new(
                client,
                auth,
                ExportRenderer::from_config(&config.export, locale),
                store,
                credentials::default_key(config.service.api_key.as_deref()),
            )
            .with_key_override(args.api_key);

            let handle = FileHandle::from_path(&args.file)?;
            let image = session.upload(&handle).await?;
            print_lines(output::format_upload(&args.file, image));

            session.choose_color(args.color)?;
            print_lines(output::format_request(args.color, &model, session.key_source()));

            let result = session.generate().await?;
            print_lines(output::format_generated(result.image()));

            let mut exported = Vec::new();
            for size in args.sizes {
                if exported.contains(&size) {
                    continue;
                }
                let path = session.download(size, &args.out)?;
                println!("{}", output::format_export(size, &path));
                exported.push(size);
            }
        }
        Command::Key { action } => {
            let config = config::load_config(&config_path)?;
            let store = open_store(cli.store.as_deref())?;
            match action {
                KeyAction::Set { key } => {
                    let key = key.trim();
                    if key.is_empty() {
                        return Err("API key is empty".into());
                    }
                    store.borrow_mut().set(API_KEY, key)?;
                    println!(
                        "Stored key {} in {}",
                        output::mask_key(key),
                        store.borrow().path().display()
                    );
                }
                KeyAction::Clear => {
                    if store.borrow_mut().remove(API_KEY)? {
                        println!("Stored key removed");
                    } else {
                        println!("No stored key");
                    }
                }
                KeyAction::Show => {
                    let creds = credentials::Credentials::new(
                        store.borrow().get(API_KEY).map(str::to_string),
                        credentials::default_key(config.service.api_key.as_deref()),
                    );
                    match creds.resolve_with_source() {
                        Ok((key, source)) => println!(
                            "{} ({})",
                            output::mask_key(key.expose()),
                            output::format_key_source(Some(source))
                        ),
                        Err(e) => println!("{e}"),
                    }
                }
            }
        }
        Command::Lang { code } => {
            let store = open_store(cli.store.as_deref())?;
            match code {
                Some(locale) => {
                    store.borrow_mut().set(LANG_KEY, locale.code())?;
                    println!("Language set to {locale}");
                }
                None => println!("{}", stored_locale(&store.borrow())),
            }
        }
        Command::Login(args) => {
            let store = open_store(cli.store.as_deref())?;
            let id = args
                .id
                .unwrap_or_else(|| format!("local:{}", args.email.trim().to_lowercase()));
            let profile = UserProfile {
                id,
                name: args.name,
                email: args.email,
                avatar_url: args.avatar_url,
            };
            let auth = LocalAuthProvider::new(store).with_identity(profile);
            let profile = auth.sign_in().await?;
            print_lines(output::format_profile(Some(&profile)));
        }
        Command::Logout => {
            let store = open_store(cli.store.as_deref())?;
            LocalAuthProvider::new(store).sign_out()?;
            println!("Signed out");
        }
        Command::Whoami => {
            let store = open_store(cli.store.as_deref())?;
            let auth = LocalAuthProvider::new(store);
            print_lines(output::format_profile(auth.current_user().borrow().as_ref()));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Open the settings store at `path`, or at the default location.
fn open_store(path: Option<&Path>) -> Result<SharedStore, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_store_path().ok_or("no user config directory; pass --store")?,
    };
    Ok(LocalStore::open(path)?.into_shared())
}
