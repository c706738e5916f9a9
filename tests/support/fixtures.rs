use std::path::{Path, PathBuf};

/// Header plus rows for a small synthetic HR export. The label is the last
/// column and tracks overtime, so a few epochs separate the classes.
pub fn attrition_csv(rows: usize) -> String {
    let departments = ["HR", "Research", "Sales"];
    let mut csv = String::from("Age,Department,OverTime,MonthlyIncome,Attrition\n");
    for idx in 0..rows {
        let overtime = idx % 3 == 0;
        let label = u8::from(overtime);
        csv.push_str(&format!(
            "{},{},{},{},{}\n",
            22 + (idx * 7) % 35,
            departments[idx % departments.len()],
            if overtime { "Yes" } else { "No" },
            2000 + (idx * 113) % 5000,
            label
        ));
    }
    csv
}

pub fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write csv fixture");
    path
}
