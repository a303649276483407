// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local};
use clap::{Args, Parser, Subcommand};
use itinera_codec::registry::FieldDefault;
use itinera_codec::{Field, FieldValue, Itinerary, LegFilter, FIELD_REGISTRY};
use itinera_core::auth::{AuthProvider, StaticAuth, UserIdentity};
use itinera_core::config::AppConfig;
use itinera_core::provider::{FlightSearchProvider, HttpSearchProvider, RecordedProvider};
use itinera_core::reconcile::{Reconciler, TableState};
use itinera_core::request::RequestBuilder;
use itinera_core::response::Candidate;
use itinera_core::session::{SearchOutcome, SearchSession};
use itinera_core::store::{DocumentStore, JsonFileStore};
use log::{info, warn};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config.json
    #[arg(long, env = "ITINERA_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Session token identifying the user
    #[arg(long, env = "ITINERA_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Flight-search API key (overrides the config)
    #[arg(long, env = "ITINERA_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where an itinerary comes from. Exactly one source is required.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct ItinerarySource {
    /// One leg as `field=value` pairs separated by `;`, e.g.
    /// `origin=PRG|VIE;destination=LHR;cabin=C`. Repeat for each leg.
    #[arg(long = "leg")]
    legs: Vec<String>,
    /// JSON file holding a list of legs keyed by field name
    #[arg(long)]
    file: Option<PathBuf>,
    /// Encoded itinerary token
    #[arg(long)]
    encoded: Option<String>,
    /// Share link
    #[arg(long)]
    link: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the filter fields in registry order
    Fields,
    /// Print the compact token for an itinerary
    Encode {
        #[command(flatten)]
        source: ItinerarySource,
    },
    /// Decode a token and print the itinerary as JSON
    Decode {
        #[arg(value_name = "TOKEN")]
        encoded: String,
    },
    /// Build a share link
    Link {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        source: ItinerarySource,
    },
    /// Read a share link
    Open { url: String },
    /// Print the provider requests a search would send
    Requests {
        #[command(flatten)]
        source: ItinerarySource,
    },
    /// Search flights and print one table per leg
    Search {
        #[command(flatten)]
        source: ItinerarySource,
        /// Pin a candidate, as `LEG=ID` (0-based leg). Repeatable.
        #[arg(long = "select")]
        selections: Vec<String>,
        /// Save the itinerary under this name, with the chosen price
        #[arg(long)]
        save: Option<String>,
    },
    /// Reconcile recorded provider responses instead of searching
    Reconcile {
        #[command(flatten)]
        source: ItinerarySource,
        /// Response files, one per batch
        #[arg(long = "response", required = true)]
        responses: Vec<PathBuf>,
        #[arg(long = "select")]
        selections: Vec<String>,
    },
    /// Save an itinerary for the signed-in user
    Save {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        source: ItinerarySource,
    },
    /// List saved itineraries
    List,
    /// Search a saved itinerary again and record its cheapest price
    Reprice { id: String },
    /// Delete a saved itinerary
    Delete { id: String },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // Fails only if a logger is already installed.
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

fn parse_leg(spec: &str) -> Result<LegFilter> {
    let mut leg = LegFilter::new();
    for pair in spec.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected field=value, got '{}'", pair))?;
        let field = Field::from_name(name.trim())
            .ok_or_else(|| anyhow!("Unknown field '{}'. See `itinera fields`.", name))?;
        let value = value.trim();
        let value = if field.is_flag() {
            FieldValue::Flag(
                value
                    .parse::<bool>()
                    .with_context(|| format!("{} expects true or false", field))?,
            )
        } else {
            FieldValue::Text(value.to_string())
        };
        leg.set(field, value)?;
    }
    Ok(leg)
}

fn load_itinerary(source: &ItinerarySource, config: &AppConfig) -> Result<Itinerary> {
    let itinerary = if let Some(path) = &source.file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?
    } else if let Some(token) = &source.encoded {
        itinera_codec::decode(token)
    } else if let Some(url) = &source.link {
        let shared = itinera_codec::parse_link(url, config.max_link_len)?;
        info!("Opened shared itinerary '{}'", shared.name);
        shared.itinerary
    } else {
        let legs = source
            .legs
            .iter()
            .map(|l| parse_leg(l))
            .collect::<Result<Vec<_>>>()?;
        Itinerary::new(legs)?
    };
    if itinerary.is_empty() {
        bail!("The itinerary has no legs");
    }
    Ok(itinerary)
}

fn parse_selection(spec: &str) -> Result<(usize, &str)> {
    let (leg, id) = spec
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected LEG=ID, got '{}'", spec))?;
    let leg = leg
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a leg number", leg))?;
    Ok((leg, id.trim()))
}

fn builder(config: &AppConfig) -> RequestBuilder {
    RequestBuilder::new(Local::now().date_naive()).with_currency(config.currency.clone())
}

fn identify(cli_token: Option<&str>, config: &AppConfig) -> Result<UserIdentity> {
    let auth = StaticAuth::from_config(config);
    let identity = auth.identify(cli_token.unwrap_or_default())?;
    info!("Signed in as {} ({})", identity.name, identity.uid);
    Ok(identity)
}

fn format_time(epoch: i64) -> String {
    DateTime::from_timestamp(epoch, 0)
        .map(|t| t.format("%d %b %H:%M").to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn describe(candidate: &Candidate) -> String {
    let flights: Vec<String> = candidate
        .segments
        .iter()
        .map(|s| {
            format!(
                "{} {}-{} {}",
                s.designator(),
                s.fly_from,
                s.fly_to,
                format_time(s.departure)
            )
        })
        .collect();
    let mut line = flights.join(", ");
    if candidate.warnings.any() {
        line.push_str(" [!]");
    }
    line
}

fn print_tables(reconciler: &Reconciler, itinerary: &Itinerary, currency: &str) {
    for (leg_idx, table) in reconciler.tables().iter().enumerate() {
        let leg = itinerary.leg(leg_idx);
        let route = leg
            .map(|l| {
                format!(
                    "{} -> {}",
                    l.text(Field::Origin).unwrap_or("?"),
                    l.text(Field::Destination).unwrap_or("?")
                )
            })
            .unwrap_or_default();
        let state = match table.state() {
            TableState::Empty => "no results",
            TableState::Populated => "choose one",
            TableState::Selected => "selected",
        };
        println!("Leg {}: {} ({})", leg_idx, route, state);
        for c in table.rows() {
            let marker = if table.selection() == Some(c.id.as_str()) {
                "[x]"
            } else {
                "[ ]"
            };
            println!(
                "  {} {:<24} {:>9.2} {} {} stop(s)  {}",
                marker,
                c.id,
                c.price,
                currency,
                c.stops,
                describe(c)
            );
        }
    }
    match reconciler.chosen() {
        Some(chosen) => println!(
            "Ready to book: {} for {:.2} {}",
            chosen.itinerary_id, chosen.price, currency
        ),
        None => println!("Select one flight per leg to book."),
    }
}

fn search_and_show(
    session: &mut SearchSession,
    provider: &dyn FlightSearchProvider,
    selections: &[String],
    currency: &str,
) -> Result<()> {
    match session.run(provider)? {
        SearchOutcome::Applied(summary) => info!(
            "{} itinerar(ies), {} row(s)",
            summary.itineraries, summary.rows_added
        ),
        SearchOutcome::Stale { .. } => warn!("Search superseded"),
    }
    for spec in selections {
        let (leg, id) = parse_selection(spec)?;
        session.select(leg, id)?;
    }
    print_tables(session.reconciler(), session.itinerary(), currency);
    Ok(())
}

/// Pins the cheapest remaining row on each leg in turn.
fn pin_cheapest(session: &mut SearchSession) -> Result<Option<f64>> {
    for leg in 0..session.reconciler().leg_count() {
        let first = session
            .reconciler()
            .table(leg)
            .and_then(|t| t.rows().first())
            .map(|c| c.id.clone());
        match first {
            Some(id) => {
                session.select(leg, &id)?;
            }
            None => return Ok(None),
        }
    }
    Ok(session.reconciler().chosen().map(|c| c.price))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load_from(&config_path)?;
    if cli.api_key.is_some() {
        config.provider_api_key = cli.api_key.clone();
    }
    let token = cli.token.as_deref();

    match &cli.command {
        Commands::Fields => {
            println!("Registry version {}", itinera_codec::REGISTRY_VERSION);
            let keys = itinera_codec::generate_keys(FIELD_REGISTRY.len());
            for (spec, key) in FIELD_REGISTRY.iter().zip(keys) {
                let default = match spec.default {
                    FieldDefault::Text("") => "(empty)".to_string(),
                    FieldDefault::Text(t) => t.to_string(),
                    FieldDefault::Flag(b) => b.to_string(),
                };
                println!("{:>2}  {:<18} default {}", key, spec.name, default);
            }
        }
        Commands::Encode { source } => {
            let itinerary = load_itinerary(source, &config)?;
            println!("{}", itinera_codec::encode(&itinerary));
        }
        Commands::Decode { encoded } => {
            let itinerary = itinera_codec::decode(encoded);
            if itinerary.is_empty() {
                warn!("Token decoded to an empty itinerary");
            }
            print_json(&itinerary)?;
        }
        Commands::Link { name, source } => {
            let itinerary = load_itinerary(source, &config)?;
            let url = itinera_codec::share_link(
                &config.share_base_url,
                name,
                &itinerary,
                config.max_link_len,
            )?;
            println!("{}", url);
        }
        Commands::Open { url } => {
            let shared = itinera_codec::parse_link(url, config.max_link_len)?;
            println!("Name: {}", shared.name);
            print_json(&shared.itinerary)?;
        }
        Commands::Requests { source } => {
            let itinerary = load_itinerary(source, &config)?;
            for batch in builder(&config).build(&itinerary)? {
                println!("# batch {} ({})", batch.index, batch.currency);
                print_json(&batch)?;
            }
        }
        Commands::Search {
            source,
            selections,
            save,
        } => {
            let itinerary = load_itinerary(source, &config)?;
            let provider = HttpSearchProvider::from_config(&config)?;
            let mut session = SearchSession::new(itinerary, builder(&config));
            search_and_show(&mut session, &provider, selections, &config.currency)?;

            if let Some(name) = save {
                let user = identify(token, &config)?;
                let store = JsonFileStore::new(config.store_root());
                let doc = store.create(&user.uid, name, session.itinerary())?;
                if let Some(chosen) = session.reconciler().chosen() {
                    store.append_price(&user.uid, &doc.id, chosen.price)?;
                }
                println!("Saved as {}", doc.id);
            }
        }
        Commands::Reconcile {
            source,
            responses,
            selections,
        } => {
            let itinerary = load_itinerary(source, &config)?;
            let recorded = responses
                .iter()
                .map(|path| {
                    let content = fs::read_to_string(path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_str::<serde_json::Value>(&content)
                        .with_context(|| format!("Failed to parse {}", path.display()))
                })
                .collect::<Result<Vec<_>>>()?;
            let provider = RecordedProvider::new(recorded);
            let mut session = SearchSession::new(itinerary, builder(&config));
            search_and_show(&mut session, &provider, selections, &config.currency)?;
        }
        Commands::Save { name, source } => {
            let itinerary = load_itinerary(source, &config)?;
            let user = identify(token, &config)?;
            let store = JsonFileStore::new(config.store_root());
            let doc = store.create(&user.uid, name, &itinerary)?;
            println!("Saved as {}", doc.id);
        }
        Commands::List => {
            let user = identify(token, &config)?;
            let store = JsonFileStore::new(config.store_root());
            let docs = store.list(&user.uid)?;
            if docs.is_empty() {
                println!("No saved itineraries.");
            }
            for doc in docs {
                let price = doc
                    .latest_price()
                    .map(|p| format!("{:.2} {}", p, config.currency))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {}  {:<24} {} leg(s)  {}",
                    doc.id,
                    doc.created.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    doc.name,
                    doc.itinerary.len(),
                    price
                );
            }
        }
        Commands::Reprice { id } => {
            let user = identify(token, &config)?;
            let store = JsonFileStore::new(config.store_root());
            let doc = store.get(&user.uid, id)?;
            let provider = HttpSearchProvider::from_config(&config)?;
            let mut session = SearchSession::new(doc.itinerary, builder(&config));
            session.run(&provider)?;
            match pin_cheapest(&mut session)? {
                Some(price) => {
                    let updated = store.append_price(&user.uid, id, price)?;
                    println!(
                        "{}: {:.2} {} ({} price point(s))",
                        updated.name,
                        price,
                        config.currency,
                        updated.price_history.len()
                    );
                }
                None => println!("No bookable itinerary found; price history unchanged."),
            }
        }
        Commands::Delete { id } => {
            let user = identify(token, &config)?;
            let store = JsonFileStore::new(config.store_root());
            store.delete(&user.uid, id)?;
            println!("Deleted {}", id);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_leg() {
        let leg = parse_leg("origin=PRG|VIE; destination=LHR;airport_change=false;airlines=OK,AF").unwrap();
        assert_eq!(leg.text(Field::Origin), Some("PRG|VIE"));
        assert_eq!(leg.text(Field::Airlines), Some("OK,AF"));
        assert!(!leg.flag(Field::AirportChange));
    }

    #[test]
    fn test_parse_leg_rejects_unknown_field() {
        assert!(parse_leg("origin=PRG;runway=27L").is_err());
        assert!(parse_leg("origin").is_err());
        assert!(parse_leg("airport_change=maybe").is_err());
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("1=abc|def").unwrap(), (1, "abc|def"));
        assert!(parse_selection("x=abc").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
