#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    agro_leads_lib::run();
}
