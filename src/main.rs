fn main() {
    if let Err(err) = vitalview_lib::run() {
        log::error!("vitalview failed: {err:#}");
        std::process::exit(1);
    }
}
