// Stepwise command-line entry point.
// Usage: stepwise <validate|compile|convert|detect> ...

fn main() {
    stepwise::cli::run();
}
