//! Bootstrap scripts attached to compute instances at launch.

/// Cloud-init script for web-role instances: install and start nginx with a
/// placeholder page naming the instance, so a fresh deployment is
/// immediately checkable over HTTP.
pub fn web_bootstrap(instance_name: &str) -> String {
    format!(
        r#"#!/bin/bash
set -euo pipefail
dnf update -y
dnf install -y nginx
cat > /usr/share/nginx/html/index.html <<'EOF'
<!DOCTYPE html>
<html>
<head><title>{name}</title></head>
<body>
<h1>{name}</h1>
<p>Provisioned by TopNet.</p>
</body>
</html>
EOF
systemctl enable nginx
systemctl start nginx
"#,
        name = instance_name
    )
}
