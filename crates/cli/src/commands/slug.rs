//! Slug commands, for building QR code links and debugging staff URLs.

use comanda_core::slug::{self, SlugError};

/// Print the slug for a name and id.
///
/// # Errors
///
/// Returns [`SlugError`] for a blank name or id, or an id containing `-`.
pub fn encode(name: &str, id: &str) -> Result<(), SlugError> {
    let slug = slug::encode(name, id)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{slug}");
    }
    Ok(())
}

/// Print what a slug decodes to.
pub fn decode(value: &str) {
    let id = slug::decode_id(value);

    #[allow(clippy::print_stdout)]
    {
        if slug::is_placeholder_segment(value) || id.is_empty() {
            println!("'{value}' carries no id; the route guard will rewrite it");
        } else {
            println!("id:   {id}");
            println!("name: {}", slug::decode_name(value));
        }
    }
}
