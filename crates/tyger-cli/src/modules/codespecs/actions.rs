use reqwest::header::LOCATION;
use reqwest::Method;
use tracing::info;

use crate::cli_args::*;
use crate::modules::codespecs::quantity::check_quantity;
use crate::modules::codespecs::types::{BufferParameters, Codespec, CodespecResources};
use crate::modules::system::http::{ensure_success, send_request};
use crate::modules::system::CommandContext;

pub(crate) async fn handle_create(args: CreateArgs, ctx: &CommandContext<'_>) -> anyhow::Result<()> {
    match args.command {
        CreateCommand::Codespec(args) => handle_create_codespec(args, ctx).await,
    }
}

async fn handle_create_codespec(
    args: CreateCodespecArgs,
    ctx: &CommandContext<'_>,
) -> anyhow::Result<()> {
    let name = args.name.clone();
    let codespec = build_codespec(args)?;
    let path = format!("v1/codespecs/{}", urlencoding::encode(&name));
    let response = send_request(ctx, Method::PUT, &path, Some(serde_json::to_value(&codespec)?)).await?;
    let response = ensure_success(response).await?;

    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| anyhow::anyhow!("server response is missing a Location header"))?;
    let version = version_from_location(location)?;
    info!(codespec = %name, version = %version, "codespec created");
    println!("{version}");
    Ok(())
}

fn build_codespec(args: CreateCodespecArgs) -> anyhow::Result<Codespec> {
    if args.image.trim().is_empty() {
        anyhow::bail!("--image must not be empty");
    }
    for (name, value) in [("cpu", &args.cpu), ("memory", &args.memory), ("gpu", &args.gpu)] {
        if let Some(value) = value {
            check_quantity(name, value)?;
        }
    }

    let (command, container_args) = if args.command {
        (args.container_args, Vec::new())
    } else {
        (Vec::new(), args.container_args)
    };
    Ok(Codespec {
        image: args.image,
        command,
        args: container_args,
        env: args.env.into_iter().collect(),
        buffers: BufferParameters {
            inputs: args.inputs,
            outputs: args.outputs,
        },
        resources: CodespecResources {
            cpu: args.cpu,
            memory: args.memory,
            gpu: args.gpu,
        },
    })
}

fn version_from_location(location: &str) -> anyhow::Result<i64> {
    let segment = location.rsplit('/').next().unwrap_or_default();
    segment.parse::<i64>().map_err(|_| {
        anyhow::anyhow!("unexpected codespec version in Location header: '{location}'")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CreateCodespecArgs {
        CreateCodespecArgs {
            name: "trainer".to_string(),
            image: "ubuntu:22.04".to_string(),
            inputs: vec!["input".to_string()],
            outputs: vec!["output".to_string()],
            env: vec![
                ("B".to_string(), "2".to_string()),
                ("A".to_string(), "1".to_string()),
            ],
            command: false,
            cpu: Some("500m".to_string()),
            memory: None,
            gpu: None,
            container_args: vec!["echo".to_string(), "hi".to_string()],
        }
    }

    #[test]
    fn trailing_args_become_container_args_by_default() {
        let codespec = build_codespec(args()).expect("codespec");
        assert!(codespec.command.is_empty());
        assert_eq!(codespec.args, vec!["echo", "hi"]);

        let value = serde_json::to_value(&codespec).expect("json");
        assert_eq!(value["buffers"]["inputs"][0], "input");
        assert_eq!(value["resources"]["cpu"], "500m");
        assert!(value["resources"].get("memory").is_none());
        assert_eq!(value["env"]["A"], "1");
    }

    #[test]
    fn command_flag_moves_trailing_args_to_command() {
        let mut args = args();
        args.command = true;
        let codespec = build_codespec(args).expect("codespec");
        assert_eq!(codespec.command, vec!["echo", "hi"]);
        assert!(codespec.args.is_empty());
    }

    #[test]
    fn invalid_quantities_are_rejected() {
        let mut args = args();
        args.memory = Some("lots".to_string());
        let err = build_codespec(args).expect_err("invalid memory");
        assert!(err.to_string().contains("memory value is invalid"));
    }

    #[test]
    fn version_is_last_location_segment() {
        assert_eq!(
            version_from_location("https://tyger.example.com/v1/codespecs/trainer/versions/3")
                .expect("version"),
            3
        );
        assert!(version_from_location("").is_err());
        assert!(version_from_location("/v1/codespecs/trainer/versions/latest").is_err());
        assert!(version_from_location("/v1/codespecs/trainer/versions/3/").is_err());
    }
}
