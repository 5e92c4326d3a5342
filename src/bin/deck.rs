//! folio-deck – renders the briefing deck to `out/deck.pdf`.
//!
//! Environment: `FOLIO_ENGINE` (`chrome` or `builtin`), `CHROME_PATH`,
//! `RUST_LOG`.

use std::process;

use folio::{render_to_file, templates, RenderConfig};

fn main() {
    env_logger::init();

    let config = RenderConfig::from_env();
    let result = templates::deck(templates::current_year())
        .map_err(folio::Error::from)
        .and_then(|doc| {
            let engine = config.build_engine();
            render_to_file(engine.as_ref(), &doc, &config, &config.deck_output)
        });

    match result {
        Ok(path) => println!("{}", path.display()),
        Err(e) => {
            log::error!("deck: {e}");
            process::exit(1);
        }
    }
}
