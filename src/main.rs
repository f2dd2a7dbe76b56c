fn main() {
    round_survival::game::run();
}
