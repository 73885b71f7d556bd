use std::error::Error;

pub fn handle_play(target: &str, index: usize) -> Result<(), Box<dyn Error>> {
    #[cfg(feature = "player")]
    {
        crate::player::run(target, index)
    }

    #[cfg(not(feature = "player"))]
    {
        let _ = target;
        let _ = index;
        use owo_colors::OwoColorize;
        println!("{} {}", "🎵".cyan(), "Terminal Player".bold());
        println!();
        println!(
            "{} The terminal player requires the 'player' feature to be enabled.",
            "Note:".yellow()
        );
        println!();
        println!("To enable it, install with:");
        println!("  {}", "cargo install docwave --features player".cyan());
        println!();
        println!("Or if building from source:");
        println!("  {}", "cargo build --release --features player".cyan());

        Ok(())
    }
}
