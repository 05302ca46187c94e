use anyhow::{Context, Result, bail};
use click_to_dial_config::Config;
use click_to_dial_engine::{
    Document, Engine, ICON_CLASS, NodeId, OutboundEvent, ParserRegistry, ReadyResponse, Settings,
    Signal,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, process};

struct Args {
    input: PathBuf,
    config: Option<PathBuf>,
    clicks: Vec<String>,
}

fn usage(program: &str) -> String {
    format!("Usage: {program} <file> [--config <path>] [--click <number>]...")
}

fn parse_args(args: &[String]) -> Result<Args> {
    let program = args.first().map(String::as_str).unwrap_or("click-to-dial-cli");
    let mut input = None;
    let mut config = None;
    let mut clicks = Vec::new();

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--click" => match rest.next() {
                Some(number) => clicks.push(number.clone()),
                None => bail!("--click needs a number\n{}", usage(program)),
            },
            "--config" => match rest.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => bail!("--config needs a path\n{}", usage(program)),
            },
            _ if input.is_none() => input = Some(PathBuf::from(arg)),
            other => bail!("Unexpected argument {other:?}\n{}", usage(program)),
        }
    }

    let Some(input) = input else {
        bail!("{}", usage(program));
    };
    Ok(Args {
        input,
        config,
        clicks,
    })
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(Config::config_path);
    log::info!("Config path: {}", config_path.display());
    let config = Config::load_from_path(&config_path)?;
    if config.is_none() {
        log::info!("No config file found, using defaults");
    }
    Ok(config.unwrap_or_default())
}

fn settings_from(config: &Config) -> Settings {
    Settings {
        quiet_period: Duration::from_millis(config.observer.quiet_period_ms),
        max_parked_nodes: config.observer.max_parked_nodes,
        chunk_size: config.observer.chunk_size,
        max_scan_elements: config.observer.max_scan_elements,
        watch_character_data: config.observer.watch_character_data,
        icon_image_url: config.icons.image_url.clone(),
        print_stylesheet_href: config.icons.print_stylesheet_href.clone(),
    }
}

/// One `<p>` per non-empty line.
fn document_from_text(content: &str) -> Result<Document> {
    let mut doc = Document::new();
    let body = doc.body();
    for line in content.lines().filter(|line| !line.trim().is_empty()) {
        let p = doc.create_element("p");
        let text = doc.create_text(line);
        doc.append_child(p, text)?;
        doc.append_child(body, p)?;
    }
    Ok(doc)
}

fn enabled_icon_for(doc: &Document, number: &str) -> Option<NodeId> {
    doc.elements_with_class(ICON_CLASS).into_iter().find(|&icon| {
        doc.attribute(icon, "data-number") == Some(number) && !doc.has_attribute(icon, "disabled")
    })
}

fn print_events(engine: &mut Engine) {
    for event in engine.take_events() {
        match event {
            OutboundEvent::ObserverReady => log::debug!("Engine asked for a ready response"),
            OutboundEvent::Dial(request) => println!("dial {}", request.number),
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let mut doc = document_from_text(&content)?;
    let parsers = ParserRegistry::with_locales(config.locales.as_slice());
    let mut engine = Engine::new(settings_from(&config), parsers);
    print_events(&mut engine);

    engine.handle(&mut doc, Signal::Ready(ReadyResponse { observe: true }));
    engine.run_until_idle(&mut doc);
    if let Some(report) = engine.sweep_report() {
        log::info!(
            "Annotated {} of {} text nodes",
            report.annotated,
            report.visited
        );
    }
    println!("{}", doc.inner_html(doc.body()));

    for number in &args.clicks {
        match enabled_icon_for(&doc, number) {
            Some(icon) => {
                engine.click(&mut doc, icon);
                print_events(&mut engine);
                // The call UI is done; allow the next click.
                engine.handle(&mut doc, Signal::EnableIcons);
            }
            None => eprintln!("No dial icon for {number}"),
        }
    }

    engine.handle(&mut doc, Signal::Stop);
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let result = parse_args(&args).and_then(run);
    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn test_parse_args_collects_clicks() {
        let args = parse_args(&strings(&[
            "ctd", "page.txt", "--click", "0201234567", "--click", "0612345678",
        ]))
        .unwrap();

        assert_eq!(args.input, PathBuf::from("page.txt"));
        assert_eq!(args.clicks, vec!["0201234567", "0612345678"]);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_parse_args_requires_input() {
        assert!(parse_args(&strings(&["ctd"])).is_err());
        assert!(parse_args(&strings(&["ctd", "a.txt", "b.txt"])).is_err());
        assert!(parse_args(&strings(&["ctd", "a.txt", "--click"])).is_err());
    }

    #[test]
    fn test_lines_become_paragraphs() {
        let doc = document_from_text("Bel ons\n\n  \n020-1234567\n").unwrap();

        assert_eq!(
            doc.inner_html(doc.body()),
            "<p>Bel ons</p><p>020-1234567</p>"
        );
    }

    #[test]
    fn test_config_maps_onto_settings() {
        let mut config = Config::default();
        config.observer.quiet_period_ms = 20;
        config.icons.image_url = "dial.svg".to_string();

        let settings = settings_from(&config);

        assert_eq!(settings.quiet_period, Duration::from_millis(20));
        assert_eq!(settings.icon_image_url, "dial.svg");
        assert_eq!(settings.chunk_size, Settings::default().chunk_size);
    }
}
