fn main() {
    studyplan_app_lib::run()
}
