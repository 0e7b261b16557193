use crate::cli::ElementsArgs;
use crate::config::Settings;
use crate::error::Result;
use crate::utils::table::element_table;
use bcadeck::core::elements::element::ElementData;

pub fn run(args: ElementsArgs, settings: &Settings) -> Result<()> {
    let catalog = settings.element_catalog()?;
    let elements: Vec<&ElementData> = match &args.query {
        Some(query) => catalog.matching(query),
        None => catalog.iter().collect(),
    };

    if elements.is_empty() {
        println!("No element matches '{}'.", args.query.as_deref().unwrap_or(""));
        return Ok(());
    }
    print!(
        "{}",
        element_table(elements, &args.locale, settings.float_precision)
    );
    Ok(())
}
