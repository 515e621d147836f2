use crate::CollectionFieldMarker;
use crate::FieldMarker;
use crate::FieldType;
use crate::Literal;
use crate::MarkerValue;
use crate::Registry;
use crate::ResourceMarker;
use crate::operator_builder_registry;

/// A deployment with a resource marker, a collection field marker on a line
/// comment, two field markers and an unrelated kubebuilder marker.
pub const DEPLOYMENT: &str = r#"# +operator-builder:resource:field=provider,value="aws",include
apiVersion: apps/v1
kind: Deployment
metadata:
  name: webstore-deploy # +operator-builder:collection:field:name=deployName,type=string
  labels:
    # +operator-builder:field:name=provider,type=string,default="aws"
    provider: aws
spec:
  # +operator-builder:field:name=webStoreReplicas,default=2,type=int,description=`Number of replicas`
  replicas: 2
  template:
    spec:
      containers:
        # +kubebuilder:validation:Optional
        - name: webstore-container
          image: nginx:1.17
"#;

/// [`DEPLOYMENT`] after the placeholder transform.
pub const DEPLOYMENT_TRANSFORMED: &str = r"apiVersion: apps/v1
kind: Deployment
metadata:
  name: !!var collection.Spec.DeployName
  labels:
    provider: !!var parent.Spec.Provider
spec:
  # Number of replicas, controlled by webStoreReplicas
  replicas: !!var parent.Spec.WebStoreReplicas
  template:
    spec:
      containers:
        # +kubebuilder:validation:Optional
        - name: webstore-container
          image: nginx:1.17
";

pub const IMAGE: &str = r#"spec:
  containers:
    - name: webstore
      # +operator-builder:field:name=webStoreImage,type=string,replace="1.17"
      image: nginx:1.17
"#;

pub fn registry() -> Registry {
	operator_builder_registry().unwrap_or_else(|e| panic!("registry: {e}"))
}

/// A registry with field markers bound to made-up prefixes, used to check
/// prefix resolution independently of the operator-builder names.
pub fn galaxy_registry() -> Registry {
	let mut registry = Registry::new();

	for prefix in ["+galaxy:planet", "+galaxy:planet:moon", "+galaxy"] {
		registry
			.define::<FieldMarker>(prefix)
			.unwrap_or_else(|e| panic!("define {prefix}: {e}"));
	}

	registry
}

pub fn field(name: &str, field_type: FieldType) -> FieldMarker {
	FieldMarker {
		name: name.into(),
		field_type,
		..FieldMarker::default()
	}
}

pub fn collection_field(name: &str, field_type: FieldType) -> MarkerValue {
	CollectionFieldMarker(field(name, field_type)).into()
}

pub fn resource(field: Option<&str>, collection_field: Option<&str>, value: Literal) -> ResourceMarker {
	ResourceMarker {
		field: field.map(Into::into),
		collection_field: collection_field.map(Into::into),
		value: Some(value),
		include: Some(true),
		..ResourceMarker::default()
	}
}
