use clap::Parser;
use object_locator::io::{object_from_json, report_from_events, write_replay_report};
use object_locator::scenario::Scenario;
use object_locator::{Locator, LocatorConfig, LocatorEvent, ViewProjection};
use std::time::Instant;

#[derive(Parser)]
#[command(version, about, author)]
struct ReplayCli {
    /// path to the scenario json
    scenario: String,

    /// locator config json, defaults are used when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// write a json report of every job here
    #[arg(short, long)]
    report: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = ReplayCli::parse();

    let scenario: Scenario = object_from_json(&cli.scenario)?;
    let config: LocatorConfig = match &cli.config {
        Some(path) => object_from_json(path)?,
        None => LocatorConfig::default(),
    };
    let view = ViewProjection::from_config(&scenario.view).ok_or("invalid view projection")?;

    let (locator, events) = Locator::new(view, config);
    let now = Instant::now();
    let (_, placements) = scenario.replay(&locator);
    log::info!(
        "replayed {} events in {:.6} sec",
        scenario.events.len(),
        now.elapsed().as_secs_f64()
    );

    let events: Vec<LocatorEvent> = events.try_iter().collect();
    for event in &events {
        match event {
            LocatorEvent::JobOpened { job, object } => {
                log::debug!("{} opened for \"{}\"", job, object)
            }
            LocatorEvent::StatusChanged { job, status } => log::debug!("{} -> {:?}", job, status),
            LocatorEvent::Placed(p) => println!(
                "{} \"{}\": [{:.3}, {:.3}, {:.3}] via {:?}",
                p.job, p.object, p.anchor.x, p.anchor.y, p.anchor.z, p.localization
            ),
            LocatorEvent::CouldNotPlace { job, object } => {
                println!("{} \"{}\": could not place", job, object)
            }
            LocatorEvent::MarkerSnapped { job, plane, position } => log::info!(
                "{} snapped onto plane {:?} at [{:.3}, {:.3}, {:.3}]",
                job,
                plane,
                position.x,
                position.y,
                position.z
            ),
        }
    }
    println!(
        "{} placed, {} still open",
        placements.len(),
        locator.active_jobs().len()
    );

    if let Some(path) = &cli.report {
        write_replay_report(path, &report_from_events(&events))?;
    }
    Ok(())
}
