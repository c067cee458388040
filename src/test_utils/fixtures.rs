//! YAML documents shared by unit and integration tests.

/// Remote action manifest modeled on `actions/checkout`.
pub const CHECKOUT_ACTION: &str = r#"name: 'Checkout'
description: 'Checkout a Git repository at a particular version'
inputs:
  repository:
    description: 'Repository name with owner'
    default: ${{ github.repository }}
  ref:
    description: >
      The branch, tag or SHA to checkout.
  token:
    description: Personal access token used to fetch the repository
    default: ${{ github.token }}
  fetch-depth:
    description: 'Number of commits to fetch'
    default: 1
outputs:
  ref:
    description: 'The branch, tag or SHA that was checked out'
  commit:
    description: 'The commit SHA that was checked out'
runs:
  using: node20
  main: dist/index.js
"#;

/// Composite action stored inside the project.
pub const LOCAL_ACTION: &str = r#"name: Build
desc: Builds one target
inputs:
  target:
    desc: Cargo target to build
    required: true
runs:
  using: composite
  steps:
    - run: cargo build --bin ${{ inputs.target }}
      shell: bash
"#;

/// Reusable workflow with a `workflow_call` interface plus a job-level
/// `outputs:` block that is not part of it.
pub const REUSABLE_WORKFLOW: &str = r#"name: Deploy
on:
  workflow_call:
    inputs:
      environment:
        description: Target environment
        type: string
        required: true
      dry-run:
        description: Only print the plan
        type: boolean
        default: false
    outputs:
      url:
        description: Deployed URL
        value: ${{ jobs.deploy.outputs.url }}
jobs:
  deploy:
    runs-on: ubuntu-latest
    outputs:
      url: ${{ steps.release.outputs.url }}
    steps:
      - uses: actions/checkout@v4
      - id: release
        run: ./deploy.sh
"#;

/// Caller workflow referencing remote, local and reusable content.
pub const CALLER_WORKFLOW: &str = r#"name: CI
on:
  push:
    branches: [main]
  pull_request:
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
        with:
          fetch-depth: 0
      - uses: ./.github/actions/build
        with:
          target: wflens
  lint:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - run: cargo clippy
  deploy:
    needs: [build, lint]
    uses: org/repo/.github/workflows/deploy.yml@main
    with:
      environment: production
"#;
