pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"00_extensions.sql" => out.push_str(include_str!("../../../sql/00_extensions.sql")),
				"tables/001_profiles.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_profiles.sql")),
				"tables/002_accounts.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_accounts.sql")),
				"tables/003_profile_recommendations.sql" => out
					.push_str(include_str!("../../../sql/tables/003_profile_recommendations.sql")),
				"tables/004_jobs.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_jobs.sql")),
				"tables/005_job_openings.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_job_openings.sql")),
				"tables/006_job_opening_applicants.sql" => out
					.push_str(include_str!("../../../sql/tables/006_job_opening_applicants.sql")),
				"tables/007_job_alert_outbox.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_job_alert_outbox.sql")),
				"tables/008_job_alert_deliveries.sql" =>
					out.push_str(include_str!("../../../sql/tables/008_job_alert_deliveries.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	#[test]
	fn expands_every_include() {
		let sql = super::render_schema();

		assert!(!sql.contains("\\ir "), "Unexpanded include left in schema.");
		assert!(sql.contains("CREATE EXTENSION IF NOT EXISTS pg_trgm"));

		for table in [
			"profiles",
			"accounts",
			"profile_recommendations",
			"jobs",
			"job_openings",
			"job_opening_applicants",
			"job_alert_outbox",
			"job_alert_deliveries",
		] {
			assert!(
				sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")),
				"Missing table {table}."
			);
		}
	}
}
