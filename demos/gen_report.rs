//! Generate an analysis report for validation testing

fn main() {
    let users = r#"[
        { "id": 1, "rol": "paciente", "profesion": "Nurse" },
        { "id": 2, "rol": "paciente", "profesion": "Teacher" },
        { "id": 3, "rol": "paciente", "profesion": "Engineer" },
        { "id": 4, "rol": "psicologo" }
    ]"#;

    let records = r#"[
        { "user_id": 1, "fecha": "2024-01-15", "mood": 4, "stress": 8, "energy": 3, "sleep": 4, "emociones": "[\"ansioso\", \"cansado\"]" },
        { "user_id": 1, "fecha": "2024-01-16", "mood": 5, "stress": 7, "energy": 4, "sleep": 5, "emociones": "{ansioso}" },
        { "user_id": 1, "fecha": "2024-01-17", "mood": 3, "stress": 9, "energy": 2, "sleep": 3 },
        { "user_id": 2, "fecha": "2024-01-15", "mood": 8, "stress": 3, "energy": 7, "sleep": 8, "emociones": ["feliz"] },
        { "user_id": 2, "fecha": "2024-01-16", "mood": 7, "stress": 4, "energy": 7, "sleep": 7 },
        { "user_id": 2, "fecha": "2024-01-18", "mood": 9, "stress": 2, "energy": 8, "sleep": 9, "emociones": ["feliz", "calmado"] },
        { "user_id": 3, "fecha": "2024-01-15", "mood": 6, "stress": 5, "energy": 6, "sleep": 6 },
        { "user_id": 3, "fecha": "2024-01-17", "mood": 6, "stress": 6, "energy": 5, "sleep": 5, "notas": "Long shift" },
        { "user_id": 4, "fecha": "2024-01-17", "mood": 7, "stress": 3, "energy": 7, "sleep": 7 }
    ]"#;

    let config = synheart_mood::AnalysisConfig::default();
    match synheart_mood::analyze_json(users, records, &config) {
        Ok(report) => print!("{report}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
