//! `colloquy count`: Count tokens the way stored messages are counted.

use colloquy_context::token;

pub async fn run(text: String, show_ids: bool) -> Result<(), Box<dyn std::error::Error>> {
    let counted = token::count(&text);
    println!("{} tokens ({})", counted.token_count, token::ENCODING);
    if show_ids {
        println!("{:?}", counted.token_ids);
    }
    Ok(())
}
