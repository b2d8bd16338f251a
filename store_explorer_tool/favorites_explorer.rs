use podshelf::app::data::genre_names;
use podshelf::config::load_config;
use rusqlite::{types::ValueRef, Connection, Result};
use std::env;
use std::fs::File;
use std::io::Write;

fn cell(v: ValueRef<'_>) -> String {
    match v {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).to_string(),
        ValueRef::Blob(_) => "<BLOB>".to_string(),
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "-h" || a == "--help") {
        eprintln!("Usage: cargo run --bin favorites_explorer [user_id] [--out file]");
        std::process::exit(1);
    }

    let user_id: Option<&str> = args
        .get(1)
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str);

    let out_file: Option<String> = args
        .iter()
        .position(|a| a == "--out")
        .and_then(|i| args.get(i + 1).cloned());

    let db_path = load_config().sqlite_path;
    println!("Opening favorites DB: {}", db_path.display());

    let conn = Connection::open(&db_path)?;
    let sql = match user_id {
        Some(_) => "SELECT * FROM favorites WHERE user_id = ?1 ORDER BY rowid",
        None => "SELECT * FROM favorites ORDER BY user_id, rowid",
    };
    let mut stmt = conn.prepare(sql)?;

    let column_names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    let genres_col = column_names.iter().position(|c| c == "genres");

    let mut rows = match user_id {
        Some(uid) => stmt.query([uid])?,
        None => stmt.query([])?,
    };

    let mut output = String::new();
    output.push_str(&format!(
        "--- favorites{} ---\n",
        user_id.map(|u| format!(" for {u}")).unwrap_or_default()
    ));
    output.push_str(&format!("Columns: {:?}\n", column_names));

    let mut count = 0usize;
    while let Some(row) = rows.next()? {
        let mut values: Vec<String> = Vec::with_capacity(column_names.len());
        for i in 0..column_names.len() {
            let mut value = cell(row.get_ref(i)?);
            if Some(i) == genres_col {
                if let Ok(ids) = serde_json::from_str::<Vec<u32>>(&value) {
                    value = format!("{value} {:?}", genre_names(&ids));
                }
            }
            values.push(value);
        }
        output.push_str(&format!("{:?}\n", values));
        count += 1;
    }
    output.push_str(&format!("{count} row(s)\n"));

    if let Some(path) = out_file {
        let mut file = File::create(&path).expect("Failed to create output file");
        file.write_all(output.as_bytes())
            .expect("Failed to write output file");
        println!("Exported results to {}", path);
    } else {
        print!("{}", output);
    }

    Ok(())
}
