mod common;

use markers_core::AnyEmptyResult;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;

#[test]
fn inspect_lists_markers_with_their_lines() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let manifest = tmp.path().join("deploy.yaml");
	std::fs::write(&manifest, common::DEPLOYMENT)?;

	common::markers_cmd()
		.arg("inspect")
		.arg("--path")
		.arg(tmp.path())
		.arg(&manifest)
		.assert()
		.success()
		.stdout(contains(
			"deploy.yaml:2 +operator-builder:resource field=provider value=aws include=true",
		))
		.stdout(contains(
			"deploy.yaml:5 +operator-builder:collection:field name=deployName type=string",
		))
		.stdout(contains(
			"deploy.yaml:8 +operator-builder:field name=provider type=string default=aws",
		))
		.stdout(contains(
			"deploy.yaml:11 +operator-builder:field name=webStoreReplicas type=int default=2",
		))
		.stdout(contains("kubebuilder").not());

	Ok(())
}

#[test]
fn inspect_json_output() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let manifest = tmp.path().join("deploy.yaml");
	std::fs::write(&manifest, common::DEPLOYMENT)?;

	let output = common::markers_cmd()
		.arg("inspect")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.arg(&manifest)
		.output()?;

	assert!(output.status.success());

	let json: Value = serde_json::from_slice(&output.stdout)?;
	let entries = json.as_array().ok_or("expected an array")?;
	assert_eq!(entries.len(), 4);
	assert_eq!(entries[0]["file"], "deploy.yaml");
	assert_eq!(entries[0]["prefix"], "+operator-builder:resource");
	assert_eq!(entries[3]["line"], 11);
	assert_eq!(entries[3]["prefix"], "+operator-builder:field");

	Ok(())
}

#[test]
fn inspect_reads_resources_from_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("config"))?;
	std::fs::write(tmp.path().join("config/deploy.yaml"), common::DEPLOYMENT)?;
	std::fs::write(tmp.path().join("config/service.yaml"), common::SERVICE)?;
	std::fs::write(
		tmp.path().join("markers.toml"),
		"resources = [\"config/deploy.yaml\", \"config/service.yaml\"]\n",
	)?;

	common::markers_cmd()
		.arg("inspect")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(contains("deploy.yaml:11 +operator-builder:field name=webStoreReplicas"))
		.stdout(contains("service.yaml:8 +operator-builder:field name=servicePort type=int"));

	Ok(())
}

#[test]
fn inspect_reports_no_markers() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let manifest = tmp.path().join("plain.yaml");
	std::fs::write(&manifest, "kind: ConfigMap\n# +kubebuilder:object:root=true\ndata: {}\n")?;

	common::markers_cmd()
		.arg("inspect")
		.arg("--path")
		.arg(tmp.path())
		.arg(&manifest)
		.assert()
		.success()
		.stdout(contains("No markers found."));

	Ok(())
}

#[test]
fn inspect_warns_about_markers_without_scope() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let manifest = tmp.path().join("replicas.yaml");
	std::fs::write(
		&manifest,
		"# +operator-builder:field:name=replicas,type=int +hello\nreplicas: 2\n",
	)?;

	common::markers_cmd()
		.arg("inspect")
		.arg("--path")
		.arg(tmp.path())
		.arg(&manifest)
		.assert()
		.success()
		.stdout(contains("replicas.yaml:2 +operator-builder:field name=replicas type=int"))
		.stderr(contains("warning: replicas.yaml: marker without scope"));

	Ok(())
}

#[test]
fn inspect_fails_on_malformed_marker() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let manifest = tmp.path().join("broken.yaml");
	std::fs::write(
		&manifest,
		"kind: Foo\nspec:\n  # +operator-builder:field:name=x,type=string,colour=red\n  x: 1\n",
	)?;

	common::markers_cmd()
		.arg("inspect")
		.arg("--path")
		.arg(tmp.path())
		.arg(&manifest)
		.assert()
		.code(2)
		.stderr(contains("unknown argument"))
		.stderr(contains("line 3 column 48"));

	Ok(())
}
