#![allow(dead_code)]

use assert_cmd::Command;

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

pub const SERVICE: &str = r"apiVersion: v1
kind: Service
metadata:
  name: webstore-svc
spec:
  type: ClusterIP
  # +operator-builder:field:name=servicePort,type=int
  port: 80
";

pub fn markers_cmd() -> Command {
	let mut cmd = Command::new(env!("CARGO_BIN_EXE_markers"));
	cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
	cmd
}
