//! folio-manual – renders the user manual to `out/manual.pdf`.
//!
//! Environment: `FOLIO_ENGINE` (`chrome` or `builtin`), `CHROME_PATH`,
//! `RUST_LOG`.

use std::process;

use folio::{render_to_file, templates, RenderConfig};

fn main() {
    env_logger::init();

    let config = RenderConfig::from_env();
    let result = templates::manual(templates::current_year())
        .map_err(folio::Error::from)
        .and_then(|doc| {
            let engine = config.build_engine();
            render_to_file(engine.as_ref(), &doc, &config, &config.manual_output)
        });

    match result {
        Ok(path) => println!("{}", path.display()),
        Err(e) => {
            log::error!("manual: {e}");
            process::exit(1);
        }
    }
}
