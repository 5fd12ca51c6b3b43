/*!

This is the long-form manual for `gevs_core` and the `gevs` command line program.

## How an election runs

1. The election commission provisions the election: constituencies, parties,
   candidates and the one-time voter codes (UVCs). See [`crate::builder::Builder`].
2. Voters check their code, then register with an email address, a password,
   their full name, date of birth, constituency and the code. A code can be used
   by one registration only.
3. The commission starts the election. Each registered voter may cast exactly one
   vote while the election is active.
4. The commission ends the election. Every constituency is tallied and the party
   holding strictly more than half of the constituencies is declared the winner.
   Otherwise the outcome is a `Hung Parliament`.

Constituency counts can be read at any time. The overall result only changes when
a tally runs.

### Constituencies

A constituency is won by the candidate with the most votes. If two or more
candidates share the lead, or if nobody voted, nobody wins the seat. Such
constituencies still count towards the majority threshold.

### Tally rules

| Field | Values | Default |
|-------|--------|---------|
| `partyTiebreakMode` | `registrationOrder`, `lexicographic` | `registrationOrder` |
| `enforceConstituencyMatch` | `true`, `false` | `false` |
| `minPasswordLength` | a positive number | `6` |

`partyTiebreakMode` only picks which of several parties with the same number of
seats is reported as leading. A tied leader never reaches a majority.

When `enforceConstituencyMatch` is set, voters may only vote for candidates standing
in their own constituency.

## The `gevs` program

```text
gevs --config election_config.json --script election_script.json --out stdout
```

* `--config` the election definition (required)
* `--script` the operations to replay
* `--out` where to write the summary: a file path or `stdout`. When absent, the
  `outputDirectory` of the configuration is used, relative to the configuration file.
* `--reference` a summary to compare against. Differences are printed and the program fails.
* `--verbose` debug logging. The `RUST_LOG` environment variable is also honoured.

### Configuration

```json
{
  "outputSettings": { "electionName": "General Election", "outputDirectory": "out" },
  "constituencies": ["Shangri-la-Town", "New-Felucia"],
  "parties": [{ "name": "Blue Party" }, { "name": "Red Party" }],
  "candidates": [
    { "id": "c1", "name": "Miss Marple", "party": "Blue Party", "constituency": "Shangri-la-Town" },
    { "id": "c2", "name": "Tom Sawyer", "party": "Red Party", "constituency": "New-Felucia" }
  ],
  "voterCodes": ["HH64FWPE", "BBMNS9ZJ"],
  "rules": { "partyTiebreakMode": "registrationOrder" }
}
```

### Script

A JSON array of operations, replayed in order. Each object has an `op` field:

* `validateCode` (`code`)
* `checkEmailExists` (`email`)
* `registerVoter` (`email`, `password`, `fullName`, `dateOfBirth` as `YYYY-MM-DD`,
  `constituency`, `code`)
* `castVote` (`email`, `password`, `candidate`): logs in, then votes for the candidate id
* `voterInfo` (`email`, `password`)
* `startElection`, `endElection`, `tally`
* `constituencyResults` (`constituency`): an exact name wins, otherwise the name is matched
  ignoring case, with `_` and `-` treated alike
* `overallResults`
* `resetVotes`, `resetSeats`

A failing operation does not stop the replay.

### Summary

* `config`: the election name and the number of constituencies
* `operations`: one entry per step with its `outcome`, either `ok` or one of
  `validation`, `conflict`, `notFound`, `store` along with the error message
* `constituencies`: the counts of every candidate and the winning party (or `null`)
* `results`: the election status, the declared winner and the seats of every party

Counts are written as strings.

*/
