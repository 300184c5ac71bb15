fn main() {
    std::process::exit(stunting_core::api::cli::main());
}
