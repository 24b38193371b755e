fn main() {
    tumble::run(tumble::config::Config::default());
}
