//! Agent image build context
//!
//! The deployment agent image is built from a temporary directory holding a
//! Dockerfile and the agent start script. The directory is removed during
//! cleanup.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

const DOCKERFILE: &str = r#"FROM ubuntu:22.04

ENV TARGETARCH="linux-x64"
ENV DEBIAN_FRONTEND=noninteractive

RUN apt-get update \
    && apt-get upgrade -y \
    && apt-get install -y curl git jq libicu70 ca-certificates \
    && curl -sL https://aka.ms/InstallAzureCLIDeb | bash \
    && rm -rf /var/lib/apt/lists/*

WORKDIR /azp/

COPY ./start.sh ./
RUN chmod +x ./start.sh

RUN useradd -m agent && chown agent ./
USER agent

ENTRYPOINT [ "./start.sh" ]
"#;

const START_SCRIPT: &str = r#"#!/bin/bash
set -e

if [ -z "${AZP_URL}" ]; then
  echo 1>&2 "error: missing AZP_URL environment variable"
  exit 1
fi

if [ -z "${AZP_TOKEN}" ]; then
  echo 1>&2 "error: missing AZP_TOKEN environment variable"
  exit 1
fi

AZP_POOL="${AZP_POOL:-Default}"
AZP_AGENT_NAME="${AZP_AGENT_NAME:-$(hostname)}"

cleanup() {
  trap "" EXIT
  if [ -e ./config.sh ]; then
    echo "Removing agent ${AZP_AGENT_NAME} from pool ${AZP_POOL}"
    ./config.sh remove --unattended --auth PAT --token "${AZP_TOKEN}" || true
  fi
}

trap "cleanup; exit 0" EXIT
trap "cleanup; exit 130" INT
trap "cleanup; exit 143" TERM

AZP_AGENT_PACKAGES=$(curl -LsS \
  -u "user:${AZP_TOKEN}" \
  -H "Accept:application/json" \
  "${AZP_URL}/_apis/distributedtask/packages/agent?platform=${TARGETARCH}&top=1")

AZP_AGENT_PACKAGE_LATEST_URL=$(echo "${AZP_AGENT_PACKAGES}" | jq -r ".value[0].downloadUrl")

if [ -z "${AZP_AGENT_PACKAGE_LATEST_URL}" ] || [ "${AZP_AGENT_PACKAGE_LATEST_URL}" = "null" ]; then
  echo 1>&2 "error: could not determine a matching agent package"
  exit 1
fi

curl -LsS "${AZP_AGENT_PACKAGE_LATEST_URL}" | tar -xz

./config.sh --unattended \
  --agent "${AZP_AGENT_NAME}" \
  --url "${AZP_URL}" \
  --auth PAT \
  --token "${AZP_TOKEN}" \
  --pool "${AZP_POOL}" \
  --work "_work" \
  --replace \
  --acceptTeeEula

unset AZP_TOKEN

chmod +x ./run.sh
./run.sh "$@" & wait $!
"#;

/// Writes the build context into `dir`, creating it when missing
pub async fn write(dir: &Path) -> Result<()> {
    info!("Creating agent build context in {}", dir.display());

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create build context {}", dir.display()))?;

    tokio::fs::write(dir.join("Dockerfile"), DOCKERFILE)
        .await
        .context("Failed to write Dockerfile")?;

    tokio::fs::write(dir.join("start.sh"), START_SCRIPT)
        .await
        .context("Failed to write start.sh")?;

    Ok(())
}

/// Removes the build context directory
///
/// # Returns
/// `false` if the directory did not exist
pub async fn remove(dir: &Path) -> Result<bool> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            debug!("Removed build context {}", dir.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => {
            Err(e).with_context(|| format!("Failed to delete build context {}", dir.display()))
        }
    }
}
