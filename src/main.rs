//! mealbook main entrypoint.

use mealbook::run;
use mealbook::ui::messages::report;

fn main() {
    if let Err(e) = run() {
        report(&e);
        std::process::exit(1);
    }
}
