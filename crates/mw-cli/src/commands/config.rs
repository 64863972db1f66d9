use mw_simulation::SimConfig;

pub fn run() -> Result<(), String> {
    let json = serde_json::to_string_pretty(&SimConfig::default()).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}
