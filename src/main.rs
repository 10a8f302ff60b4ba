fn main() {
    if let Err(err) = ratemyhydrograph_lib::run() {
        eprintln!("ratemyhydrograph: {err:#}");
        std::process::exit(1);
    }
}
