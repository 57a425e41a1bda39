use std::env;
use std::error::Error;

use ninkit::formats::byml::Document;

fn main() -> Result<(), Box<dyn Error>> {
    let path = env::args().nth(1).ok_or("usage: byml2json <file.byml>")?;
    let doc = Document::from_file(&path)?;

    match doc.root() {
        Some(root) => println!("{}", serde_json::to_string_pretty(root)?),
        None => println!("null"),
    }

    Ok(())
}
